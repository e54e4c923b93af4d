//! Loan coordination on top of the three entity stores.
//!
//! [`Catalog`] owns the in-memory database and is the only place that reads
//! across tables. Every check-then-write sequence runs inside one SQLite
//! transaction, so "is the book free?" and "record the loan" can never be
//! split by another mutation.

use std::fmt;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::db;
use crate::error::{CatalogError, Entity};
use crate::models::{Book, Loan, Person};

pub use crate::error::Result;

/// What deleting a book or person referenced by an active loan does.
/// Returned loans never stand in the way of a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Refuse the delete and leave everything as it was.
    #[default]
    Block,
    /// Mark the active loan returned, then delete.
    CloseLoans,
    /// Delete anyway and leave the loan pointing at a missing id.
    Orphan,
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeletePolicy::Block => "block",
            DeletePolicy::CloseLoans => "close-loans",
            DeletePolicy::Orphan => "orphan",
        };
        f.write_str(label)
    }
}

pub struct Catalog {
    conn: Connection,
    delete_policy: DeletePolicy,
}

impl Catalog {
    /// Build an empty catalog backed by a private in-memory database.
    pub fn new(delete_policy: DeletePolicy) -> Result<Self> {
        let conn = db::open_in_memory()?;
        info!(%delete_policy, "catalog ready");
        Ok(Self {
            conn,
            delete_policy,
        })
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Store a new book; a taken id is `AlreadyExists`.
    pub fn add_book(&mut self, book: &Book) -> Result<()> {
        db::save_book(&self.conn, book)?;
        info!(book_id = book.id, title = %book.title, "book added");
        Ok(())
    }

    /// Replace an existing book. Loans keep pointing at it by id.
    pub fn update_book(&mut self, book: &Book) -> Result<()> {
        db::update_book(&self.conn, book)?;
        info!(book_id = book.id, "book updated");
        Ok(())
    }

    /// Delete a book, applying the delete policy when it is out on loan.
    pub fn delete_book(&mut self, id: i64) -> Result<()> {
        let policy = self.delete_policy;
        let tx = self.conn.transaction()?;
        if db::get_book(&tx, id)?.is_none() {
            return Err(CatalogError::not_found(Entity::Book, id));
        }

        if let Some(loan) = db::active_loan_for_book(&tx, id)? {
            match policy {
                DeletePolicy::Block => {
                    warn!(book_id = id, loan_id = loan.id, "delete blocked by active loan");
                    return Err(CatalogError::BookOnLoan {
                        book_id: id,
                        loan_id: loan.id,
                    });
                }
                DeletePolicy::CloseLoans => close_loan(&tx, loan)?,
                DeletePolicy::Orphan => {
                    warn!(book_id = id, loan_id = loan.id, "orphaning active loan");
                }
            }
        }

        db::delete_book(&tx, id)?;
        tx.commit()?;
        info!(book_id = id, "book deleted");
        Ok(())
    }

    pub fn get_book(&self, id: i64) -> Result<Option<Book>> {
        db::get_book(&self.conn, id)
    }

    pub fn list_books(&self) -> Result<Vec<Book>> {
        db::list_books(&self.conn)
    }

    /// Store a new person; a taken id is `AlreadyExists`.
    pub fn add_person(&mut self, person: &Person) -> Result<()> {
        db::save_person(&self.conn, person)?;
        info!(person_id = person.id, name = %person.name, "person added");
        Ok(())
    }

    /// Replace an existing person's name and city.
    pub fn update_person(&mut self, person: &Person) -> Result<()> {
        db::update_person(&self.conn, person)?;
        info!(person_id = person.id, "person updated");
        Ok(())
    }

    /// Delete a person, applying the delete policy when they hold a loan.
    pub fn delete_person(&mut self, id: i64) -> Result<()> {
        let policy = self.delete_policy;
        let tx = self.conn.transaction()?;
        if db::get_person(&tx, id)?.is_none() {
            return Err(CatalogError::not_found(Entity::Person, id));
        }

        if let Some(loan) = db::active_loan_for_person(&tx, id)? {
            match policy {
                DeletePolicy::Block => {
                    warn!(person_id = id, loan_id = loan.id, "delete blocked by active loan");
                    return Err(CatalogError::PersonHasLoan {
                        person_id: id,
                        loan_id: loan.id,
                    });
                }
                DeletePolicy::CloseLoans => close_loan(&tx, loan)?,
                DeletePolicy::Orphan => {
                    warn!(person_id = id, loan_id = loan.id, "orphaning active loan");
                }
            }
        }

        db::delete_person(&tx, id)?;
        tx.commit()?;
        info!(person_id = id, "person deleted");
        Ok(())
    }

    pub fn get_person(&self, id: i64) -> Result<Option<Person>> {
        db::get_person(&self.conn, id)
    }

    pub fn list_persons(&self) -> Result<Vec<Person>> {
        db::list_persons(&self.conn)
    }

    /// Whether a non-returned loan references `book_id`.
    pub fn is_book_loaned(&self, book_id: i64) -> Result<bool> {
        let loaned = db::active_loan_for_book(&self.conn, book_id)?.is_some();
        debug!(book_id, loaned, "checked book availability");
        Ok(loaned)
    }

    /// Whether `person_id` currently holds a non-returned loan.
    pub fn is_person_loaning(&self, person_id: i64) -> Result<bool> {
        let loaning = db::active_loan_for_person(&self.conn, person_id)?.is_some();
        debug!(person_id, loaning, "checked person availability");
        Ok(loaning)
    }

    /// Record a new loan. The book and person must exist and both must be
    /// free; the check and the insert share one transaction. The stored loan
    /// always starts unreturned and is handed back to the caller.
    pub fn add_loan(&mut self, loan: &Loan) -> Result<Loan> {
        let loan = Loan {
            returned: false,
            ..loan.clone()
        };

        let tx = self.conn.transaction()?;
        if db::get_loan(&tx, loan.id)?.is_some() {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Loan,
                id: loan.id,
            });
        }
        ensure_exists(&tx, &loan)?;
        if let Err(err) = ensure_available(&tx, &loan) {
            warn!(loan_id = loan.id, error = %err, "loan rejected");
            return Err(err);
        }
        db::save_loan(&tx, &loan)?;
        tx.commit()?;

        info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            person_id = loan.person_id,
            due_date = %loan.due_date,
            "loan created"
        );
        Ok(loan)
    }

    /// Replace a loan. When the replacement is active (a re-opened loan, or a
    /// changed book or person), the same availability rules as `add_loan`
    /// apply, ignoring the loan itself.
    pub fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        let tx = self.conn.transaction()?;
        let existing = db::get_loan(&tx, loan.id)?
            .ok_or_else(|| CatalogError::not_found(Entity::Loan, loan.id))?;

        if loan.is_active() {
            let reopening = existing.returned;
            if reopening
                || existing.book_id != loan.book_id
                || existing.person_id != loan.person_id
            {
                ensure_exists(&tx, loan)?;
            }
            if let Err(err) = ensure_available(&tx, loan) {
                warn!(loan_id = loan.id, error = %err, "loan update rejected");
                return Err(err);
            }
        }

        db::update_loan(&tx, loan)?;
        tx.commit()?;
        info!(loan_id = loan.id, returned = loan.returned, "loan updated");
        Ok(())
    }

    /// Mark a loan returned. Returning it twice is harmless.
    pub fn return_loan(&mut self, id: i64) -> Result<Loan> {
        let mut loan =
            db::get_loan(&self.conn, id)?.ok_or_else(|| CatalogError::not_found(Entity::Loan, id))?;
        if loan.returned {
            debug!(loan_id = id, "loan already returned");
            return Ok(loan);
        }

        loan.returned = true;
        db::update_loan(&self.conn, &loan)?;
        info!(loan_id = id, book_id = loan.book_id, "loan returned");
        Ok(loan)
    }

    pub fn delete_loan(&mut self, id: i64) -> Result<()> {
        db::delete_loan(&self.conn, id)?;
        info!(loan_id = id, "loan deleted");
        Ok(())
    }

    pub fn get_loan(&self, id: i64) -> Result<Option<Loan>> {
        db::get_loan(&self.conn, id)
    }

    pub fn list_loans(&self) -> Result<Vec<Loan>> {
        db::list_loans(&self.conn)
    }
}

/// The loan's book and person must both be on file.
fn ensure_exists(conn: &Connection, loan: &Loan) -> Result<()> {
    if db::get_book(conn, loan.book_id)?.is_none() {
        return Err(CatalogError::not_found(Entity::Book, loan.book_id));
    }
    if db::get_person(conn, loan.person_id)?.is_none() {
        return Err(CatalogError::not_found(Entity::Person, loan.person_id));
    }
    Ok(())
}

/// No other active loan may hold the book or the person.
fn ensure_available(conn: &Connection, loan: &Loan) -> Result<()> {
    if let Some(active) = db::active_loan_for_book(conn, loan.book_id)? {
        if active.id != loan.id {
            return Err(CatalogError::BookOnLoan {
                book_id: loan.book_id,
                loan_id: active.id,
            });
        }
    }
    if let Some(active) = db::active_loan_for_person(conn, loan.person_id)? {
        if active.id != loan.id {
            return Err(CatalogError::PersonHasLoan {
                person_id: loan.person_id,
                loan_id: active.id,
            });
        }
    }
    Ok(())
}

fn close_loan(conn: &Connection, mut loan: Loan) -> Result<()> {
    loan.returned = true;
    db::update_loan(conn, &loan)?;
    info!(loan_id = loan.id, "loan closed by delete policy");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(policy: DeletePolicy) -> Catalog {
        let mut catalog = Catalog::new(policy).unwrap();
        catalog.add_book(&Book::new(1, "Go", "A")).unwrap();
        catalog.add_book(&Book::new(2, "Rust", "B")).unwrap();
        catalog.add_person(&Person::new(1, "Ana", "Bandung")).unwrap();
        catalog.add_person(&Person::new(2, "Budi", "Medan")).unwrap();
        catalog
    }

    fn sorted_ids<T>(items: Vec<T>, id: impl Fn(&T) -> i64) -> Vec<i64> {
        let mut ids: Vec<i64> = items.iter().map(id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn loan_lifecycle_scenario() {
        let mut catalog = Catalog::new(DeletePolicy::Block).unwrap();
        catalog.add_book(&Book::new(1, "Go", "A")).unwrap();
        catalog.add_person(&Person::new(1, "Ana", "Bandung")).unwrap();
        assert!(!catalog.is_book_loaned(1).unwrap());
        assert!(!catalog.is_person_loaning(1).unwrap());

        let loan = Loan::new(1, 1, 1, "2024-01-01");
        catalog.add_loan(&loan).unwrap();
        assert!(catalog.is_book_loaned(1).unwrap());
        assert!(catalog.is_person_loaning(1).unwrap());

        let err = catalog.add_loan(&loan).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::AlreadyExists { entity: Entity::Loan, id: 1 }
        ));
        assert_eq!(catalog.list_loans().unwrap(), vec![loan.clone()]);

        catalog
            .update_loan(&Loan {
                returned: true,
                ..loan
            })
            .unwrap();
        assert!(!catalog.is_book_loaned(1).unwrap());
        assert!(!catalog.is_person_loaning(1).unwrap());
    }

    #[test]
    fn add_loan_forces_unreturned() {
        let mut catalog = seeded(DeletePolicy::Block);
        let mut loan = Loan::new(1, 1, 1, "soon");
        loan.returned = true;

        let stored = catalog.add_loan(&loan).unwrap();
        assert!(!stored.returned);
        assert!(catalog.is_book_loaned(1).unwrap());
    }

    #[test]
    fn book_cannot_be_lent_twice() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();

        let err = catalog.add_loan(&Loan::new(2, 1, 2, "2024-01-01")).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::BookOnLoan { book_id: 1, loan_id: 1 }
        ));
        assert_eq!(catalog.list_loans().unwrap().len(), 1);
    }

    #[test]
    fn person_cannot_hold_two_loans() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();

        let err = catalog.add_loan(&Loan::new(2, 2, 1, "2024-01-01")).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PersonHasLoan { person_id: 1, loan_id: 1 }
        ));
        assert!(!catalog.is_book_loaned(2).unwrap());
    }

    #[test]
    fn returned_book_can_be_lent_again() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        catalog.return_loan(1).unwrap();

        catalog.add_loan(&Loan::new(2, 1, 2, "2024-02-01")).unwrap();
        assert!(catalog.is_book_loaned(1).unwrap());
        assert!(!catalog.is_person_loaning(1).unwrap());
        assert!(catalog.is_person_loaning(2).unwrap());
    }

    #[test]
    fn loan_requires_known_book_and_person() {
        let mut catalog = seeded(DeletePolicy::Block);

        assert!(matches!(
            catalog.add_loan(&Loan::new(1, 99, 1, "")),
            Err(CatalogError::NotFound { entity: Entity::Book, id: 99 })
        ));
        assert!(matches!(
            catalog.add_loan(&Loan::new(1, 1, 99, "")),
            Err(CatalogError::NotFound { entity: Entity::Person, id: 99 })
        ));
        assert!(catalog.list_loans().unwrap().is_empty());
    }

    #[test]
    fn reopening_collides_with_newer_loan() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        let returned = catalog.return_loan(1).unwrap();
        catalog.add_loan(&Loan::new(2, 1, 2, "2024-02-01")).unwrap();

        let reopened = Loan {
            returned: false,
            ..returned.clone()
        };
        let err = catalog.update_loan(&reopened).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::BookOnLoan { book_id: 1, loan_id: 2 }
        ));
        assert_eq!(catalog.get_loan(1).unwrap(), Some(returned));
    }

    #[test]
    fn moving_active_loan_to_busy_person_is_rejected() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        catalog.add_loan(&Loan::new(2, 2, 2, "2024-01-01")).unwrap();

        let err = catalog
            .update_loan(&Loan::new(2, 2, 1, "2024-01-01"))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PersonHasLoan { person_id: 1, loan_id: 1 }
        ));
        assert_eq!(
            catalog.get_loan(2).unwrap(),
            Some(Loan::new(2, 2, 2, "2024-01-01"))
        );
        assert!(catalog.is_person_loaning(2).unwrap());
    }

    #[test]
    fn active_loan_can_change_its_due_date() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();

        let extended = Loan::new(1, 1, 1, "2024-03-01");
        catalog.update_loan(&extended).unwrap();
        assert_eq!(catalog.get_loan(1).unwrap(), Some(extended));
    }

    #[test]
    fn loan_operations_on_missing_ids() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        let before = catalog.list_loans().unwrap();

        assert!(matches!(
            catalog.update_loan(&Loan::new(5, 1, 1, "")),
            Err(CatalogError::NotFound { entity: Entity::Loan, id: 5 })
        ));
        assert!(matches!(
            catalog.return_loan(5),
            Err(CatalogError::NotFound { entity: Entity::Loan, id: 5 })
        ));
        assert!(matches!(
            catalog.delete_loan(5),
            Err(CatalogError::NotFound { entity: Entity::Loan, id: 5 })
        ));
        assert_eq!(catalog.list_loans().unwrap(), before);
        assert!(catalog.is_book_loaned(1).unwrap());
    }

    #[test]
    fn return_is_idempotent() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();

        let first = catalog.return_loan(1).unwrap();
        let second = catalog.return_loan(1).unwrap();
        assert_eq!(first, second);
        assert!(second.returned);
    }

    #[test]
    fn deleting_loan_frees_book_and_id() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        catalog.delete_loan(1).unwrap();

        assert!(!catalog.is_book_loaned(1).unwrap());
        catalog.add_loan(&Loan::new(1, 1, 2, "2024-05-01")).unwrap();
    }

    #[test]
    fn block_policy_refuses_delete_of_lent_entities() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();

        assert!(matches!(
            catalog.delete_book(1),
            Err(CatalogError::BookOnLoan { book_id: 1, loan_id: 1 })
        ));
        assert!(matches!(
            catalog.delete_person(1),
            Err(CatalogError::PersonHasLoan { person_id: 1, loan_id: 1 })
        ));
        assert_eq!(sorted_ids(catalog.list_books().unwrap(), |b| b.id), vec![1, 2]);
        assert_eq!(sorted_ids(catalog.list_persons().unwrap(), |p| p.id), vec![1, 2]);
        assert!(catalog.is_book_loaned(1).unwrap());
    }

    #[test]
    fn returned_loans_never_block_deletes() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        catalog.return_loan(1).unwrap();

        catalog.delete_book(1).unwrap();
        catalog.delete_person(1).unwrap();
        assert_eq!(catalog.list_loans().unwrap().len(), 1);
    }

    #[test]
    fn close_loans_policy_returns_then_deletes() {
        let mut catalog = seeded(DeletePolicy::CloseLoans);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();
        catalog.add_loan(&Loan::new(2, 2, 2, "2024-01-01")).unwrap();

        catalog.delete_book(1).unwrap();
        catalog.delete_person(2).unwrap();

        assert!(catalog.get_loan(1).unwrap().unwrap().returned);
        assert!(catalog.get_loan(2).unwrap().unwrap().returned);
        assert!(!catalog.is_person_loaning(1).unwrap());
        assert_eq!(catalog.get_book(1).unwrap(), None);
        assert_eq!(catalog.get_person(2).unwrap(), None);
    }

    #[test]
    fn orphan_policy_leaves_dangling_loan() {
        let mut catalog = seeded(DeletePolicy::Orphan);
        catalog.add_loan(&Loan::new(1, 1, 1, "2024-01-01")).unwrap();

        catalog.delete_book(1).unwrap();
        let loan = catalog.get_loan(1).unwrap().unwrap();
        assert!(loan.is_active());
        assert!(catalog.is_book_loaned(1).unwrap());
        assert_eq!(catalog.get_book(1).unwrap(), None);
    }

    #[test]
    fn deleting_unknown_entities_reports_not_found() {
        let mut catalog = seeded(DeletePolicy::Block);
        assert!(matches!(
            catalog.delete_book(42),
            Err(CatalogError::NotFound { entity: Entity::Book, id: 42 })
        ));
        assert!(matches!(
            catalog.delete_person(42),
            Err(CatalogError::NotFound { entity: Entity::Person, id: 42 })
        ));
    }

    #[test]
    fn update_is_replacement_not_merge() {
        let mut catalog = seeded(DeletePolicy::Block);
        catalog.update_book(&Book::new(1, "Go 2", "")).unwrap();
        catalog.update_person(&Person::new(1, "Ana", "")).unwrap();

        assert_eq!(catalog.get_book(1).unwrap(), Some(Book::new(1, "Go 2", "")));
        assert_eq!(
            catalog.get_person(1).unwrap(),
            Some(Person::new(1, "Ana", ""))
        );
    }

    #[test]
    fn delete_policy_labels_match_config_values() {
        assert_eq!(DeletePolicy::Block.to_string(), "block");
        assert_eq!(DeletePolicy::CloseLoans.to_string(), "close-loans");
        assert_eq!(DeletePolicy::Orphan.to_string(), "orphan");
        assert_eq!(DeletePolicy::default(), DeletePolicy::Block);
    }
}
