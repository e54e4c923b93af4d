//! Ratatui front-end: a tab per table, modal forms for add and edit, and a
//! footer carrying the last status message. Every change goes through the
//! [`Catalog`](crate::catalog::Catalog), so the loan rules hold no matter
//! which screen triggered it.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
