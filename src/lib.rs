//! Core library surface for the Library Catalog TUI.
//!
//! The catalog tracks books, persons and loans in an in-memory database and
//! guarantees that a book is lent to at most one person and a person holds at
//! most one active loan at a time.
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;

/// The coordination layer and its delete policy.
pub use catalog::{Catalog, DeletePolicy};

pub use config::CatalogConfig;
pub use error::{CatalogError, Entity};
pub use logging::init_logging;

/// The three domain types that other layers manipulate.
pub use models::{Address, Book, Loan, Person};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
