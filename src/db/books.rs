use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_duplicate_id, CatalogError, Entity, Result};
use crate::models::Book;

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
    })
}

/// Insert a new book. Fails with `AlreadyExists` when the id is taken and
/// leaves the stored book untouched.
pub fn save_book(conn: &Connection, book: &Book) -> Result<()> {
    conn.execute(
        "INSERT INTO books (id, title, author) VALUES (?1, ?2, ?3)",
        params![book.id, book.title, book.author],
    )
    .map_err(|err| map_duplicate_id(err, Entity::Book, book.id))?;
    Ok(())
}

/// Replace every field of an existing book.
pub fn update_book(conn: &Connection, book: &Book) -> Result<()> {
    let updated = conn.execute(
        "UPDATE books SET title = ?1, author = ?2 WHERE id = ?3",
        params![book.title, book.author, book.id],
    )?;

    if updated == 0 {
        Err(CatalogError::not_found(Entity::Book, book.id))
    } else {
        Ok(())
    }
}

/// Remove a book row. `NotFound` when the id is unknown.
pub fn delete_book(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;

    if deleted == 0 {
        Err(CatalogError::not_found(Entity::Book, id))
    } else {
        Ok(())
    }
}

/// Look up one book; a missing id is `Ok(None)`.
pub fn get_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            "SELECT id, title, author FROM books WHERE id = ?1",
            params![id],
            book_from_row,
        )
        .optional()?;
    Ok(book)
}

/// Every stored book. Rows come back sorted by id so the UI list is stable,
/// but the ordering is not part of the store contract.
pub fn list_books(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare("SELECT id, title, author FROM books ORDER BY id")?;
    let books = stmt
        .query_map([], book_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}
