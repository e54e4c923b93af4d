//! Entity stores split across one submodule per table. Each store only knows
//! its own table: insert, full replacement, delete and listing. Rules that
//! span tables belong to [`crate::catalog`].

mod books;
mod connection;
mod loans;
mod persons;

pub use books::{delete_book, get_book, list_books, save_book, update_book};
pub use connection::{ensure_schema, open_in_memory};
pub use loans::{
    active_loan_for_book, active_loan_for_person, delete_loan, get_loan, list_loans, save_loan,
    update_loan,
};
pub use persons::{delete_person, get_person, list_persons, save_person, update_person};
