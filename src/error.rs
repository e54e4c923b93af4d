//! Error contract shared by the entity stores and the loan coordination
//! layer. Store failures travel up through the catalog untouched, so the UI
//! sees the same `AlreadyExists` / `NotFound` the store produced.

use std::fmt;

use rusqlite::{Error as SqlError, ErrorCode};
use thiserror::Error;

/// Which store an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    Person,
    Loan,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Book => "Book",
            Entity::Person => "Person",
            Entity::Loan => "Loan",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} already exists.")]
    AlreadyExists { entity: Entity, id: i64 },

    #[error("{entity} {id} not found.")]
    NotFound { entity: Entity, id: i64 },

    #[error("Book {book_id} is already on loan {loan_id}.")]
    BookOnLoan { book_id: i64, loan_id: i64 },

    #[error("Person {person_id} already holds loan {loan_id}.")]
    PersonHasLoan { person_id: i64, loan_id: i64 },

    #[error("database error: {0}")]
    Database(#[from] SqlError),
}

impl CatalogError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Coerce a primary key violation on insert into `AlreadyExists`. Every other
/// SQLite failure is passed through as a database error.
pub(crate) fn map_duplicate_id(err: SqlError, entity: Entity, id: i64) -> CatalogError {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        CatalogError::AlreadyExists { entity, id }
    } else {
        err.into()
    }
}
