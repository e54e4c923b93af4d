use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// Open a fresh in-memory database and create the three entity tables. The
/// catalog never touches disk: everything lives for as long as the returned
/// connection does.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    ensure_schema(&conn)?;
    debug!("opened in-memory catalog database");
    Ok(conn)
}

/// Create the tables if missing. Ids are caller-assigned, so the primary keys
/// are plain `INTEGER PRIMARY KEY` columns without AUTOINCREMENT.
///
/// Loans deliberately carry no foreign keys: the loan store keeps its copies
/// of the book and person ids and leaves cross-table rules to the catalog.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS persons (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            city TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY,
            book_id INTEGER NOT NULL,
            person_id INTEGER NOT NULL,
            due_date TEXT NOT NULL,
            returned INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS loans_active_book
            ON loans (book_id) WHERE returned = 0;

        CREATE INDEX IF NOT EXISTS loans_active_person
            ON loans (person_id) WHERE returned = 0;",
    )?;
    Ok(())
}
