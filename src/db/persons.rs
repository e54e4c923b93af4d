use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_duplicate_id, CatalogError, Entity, Result};
use crate::models::{Address, Person};

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        name: row.get(1)?,
        address: Address { city: row.get(2)? },
    })
}

/// Insert a new person, or `AlreadyExists` when the id is taken.
pub fn save_person(conn: &Connection, person: &Person) -> Result<()> {
    conn.execute(
        "INSERT INTO persons (id, name, city) VALUES (?1, ?2, ?3)",
        params![person.id, person.name, person.address.city],
    )
    .map_err(|err| map_duplicate_id(err, Entity::Person, person.id))?;
    Ok(())
}

/// Replace name and address of an existing person.
pub fn update_person(conn: &Connection, person: &Person) -> Result<()> {
    let updated = conn.execute(
        "UPDATE persons SET name = ?1, city = ?2 WHERE id = ?3",
        params![person.name, person.address.city, person.id],
    )?;

    if updated == 0 {
        Err(CatalogError::not_found(Entity::Person, person.id))
    } else {
        Ok(())
    }
}

/// Remove a person row. Loans referencing the person are left alone here;
/// what happens to them is decided by the catalog's delete policy.
pub fn delete_person(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM persons WHERE id = ?1", params![id])?;

    if deleted == 0 {
        Err(CatalogError::not_found(Entity::Person, id))
    } else {
        Ok(())
    }
}

/// Look up one person; a missing id is `Ok(None)`.
pub fn get_person(conn: &Connection, id: i64) -> Result<Option<Person>> {
    let person = conn
        .query_row(
            "SELECT id, name, city FROM persons WHERE id = ?1",
            params![id],
            person_from_row,
        )
        .optional()?;
    Ok(person)
}

/// Every stored person, sorted by id.
pub fn list_persons(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn.prepare("SELECT id, name, city FROM persons ORDER BY id")?;
    let persons = stmt
        .query_map([], person_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(persons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn save_update_delete_cycle() {
        let conn = open_in_memory().unwrap();
        save_person(&conn, &Person::new(1, "Ana", "Bandung")).unwrap();
        update_person(&conn, &Person::new(1, "Ana Maria", "Jakarta")).unwrap();

        let stored = get_person(&conn, 1).unwrap().unwrap();
        assert_eq!(stored.name, "Ana Maria");
        assert_eq!(stored.address.city, "Jakarta");

        delete_person(&conn, 1).unwrap();
        assert!(list_persons(&conn).unwrap().is_empty());
    }

    #[test]
    fn duplicate_and_missing_ids() {
        let conn = open_in_memory().unwrap();
        save_person(&conn, &Person::new(1, "Ana", "Bandung")).unwrap();

        assert!(matches!(
            save_person(&conn, &Person::new(1, "Budi", "Medan")),
            Err(CatalogError::AlreadyExists { entity: Entity::Person, id: 1 })
        ));
        assert!(matches!(
            update_person(&conn, &Person::new(9, "Budi", "Medan")),
            Err(CatalogError::NotFound { entity: Entity::Person, id: 9 })
        ));
        assert!(matches!(
            delete_person(&conn, 9),
            Err(CatalogError::NotFound { entity: Entity::Person, id: 9 })
        ));
        assert_eq!(
            list_persons(&conn).unwrap(),
            vec![Person::new(1, "Ana", "Bandung")]
        );
    }
}
