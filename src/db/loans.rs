//! Loan store. Pure persistence: it never looks at the book or person tables,
//! so availability rules are the catalog's job.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_duplicate_id, CatalogError, Entity, Result};
use crate::models::Loan;

const LOAN_COLUMNS: &str = "id, book_id, person_id, due_date, returned";

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get(0)?,
        book_id: row.get(1)?,
        person_id: row.get(2)?,
        due_date: row.get(3)?,
        returned: row.get(4)?,
    })
}

/// Insert a loan exactly as given, returned flag included.
pub fn save_loan(conn: &Connection, loan: &Loan) -> Result<()> {
    conn.execute(
        "INSERT INTO loans (id, book_id, person_id, due_date, returned)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            loan.id,
            loan.book_id,
            loan.person_id,
            loan.due_date,
            loan.returned
        ],
    )
    .map_err(|err| map_duplicate_id(err, Entity::Loan, loan.id))?;
    Ok(())
}

/// Replace every field of an existing loan, including the returned flag.
pub fn update_loan(conn: &Connection, loan: &Loan) -> Result<()> {
    let updated = conn.execute(
        "UPDATE loans SET book_id = ?1, person_id = ?2, due_date = ?3, returned = ?4
         WHERE id = ?5",
        params![
            loan.book_id,
            loan.person_id,
            loan.due_date,
            loan.returned,
            loan.id
        ],
    )?;

    if updated == 0 {
        Err(CatalogError::not_found(Entity::Loan, loan.id))
    } else {
        Ok(())
    }
}

/// Remove a loan row, or `NotFound` when there is none.
pub fn delete_loan(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM loans WHERE id = ?1", params![id])?;

    if deleted == 0 {
        Err(CatalogError::not_found(Entity::Loan, id))
    } else {
        Ok(())
    }
}

/// Look up a loan by id. A missing id is `Ok(None)`, not an error.
pub fn get_loan(conn: &Connection, id: i64) -> Result<Option<Loan>> {
    let loan = conn
        .query_row(
            &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"),
            params![id],
            loan_from_row,
        )
        .optional()?;
    Ok(loan)
}

/// Every loan, returned ones included.
pub fn list_loans(conn: &Connection) -> Result<Vec<Loan>> {
    let mut stmt = conn.prepare(&format!("SELECT {LOAN_COLUMNS} FROM loans ORDER BY id"))?;
    let loans = stmt
        .query_map([], loan_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(loans)
}

/// The non-returned loan holding `book_id`, if any. Served by the
/// `loans_active_book` partial index instead of a scan over every loan.
pub fn active_loan_for_book(conn: &Connection, book_id: i64) -> Result<Option<Loan>> {
    let loan = conn
        .query_row(
            &format!(
                "SELECT {LOAN_COLUMNS} FROM loans
                 WHERE book_id = ?1 AND returned = 0
                 ORDER BY id LIMIT 1"
            ),
            params![book_id],
            loan_from_row,
        )
        .optional()?;
    Ok(loan)
}

/// The non-returned loan held by `person_id`, if any.
pub fn active_loan_for_person(conn: &Connection, person_id: i64) -> Result<Option<Loan>> {
    let loan = conn
        .query_row(
            &format!(
                "SELECT {LOAN_COLUMNS} FROM loans
                 WHERE person_id = ?1 AND returned = 0
                 ORDER BY id LIMIT 1"
            ),
            params![person_id],
            loan_from_row,
        )
        .optional()?;
    Ok(loan)
}
