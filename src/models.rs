//! Domain models that mirror the catalog tables and get passed throughout the
//! TUI. They stay plain data holders: every read hands out an owned copy, so
//! the only way to change stored state is through the catalog operations.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A book on the library shelves.
pub struct Book {
    /// Caller-assigned identifier, unique within the book store.
    pub id: i64,
    pub title: String,
    pub author: String,
}

impl Book {
    pub fn new(id: i64, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
        }
    }
}

impl fmt::Display for Book {
    /// `Title - Author`, dropping the hyphen when the author is blank.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.author.trim().is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.title, self.author)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Postal details for a person. Only the city is tracked today.
pub struct Address {
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A library member who can borrow books.
pub struct Person {
    /// Caller-assigned identifier, unique within the person store.
    pub id: i64,
    pub name: String,
    pub address: Address,
}

impl Person {
    pub fn new(id: i64, name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: Address { city: city.into() },
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.city.trim().is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.address.city)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A book lent to a person. The book and person are referenced by id only;
/// the loan keeps its copy of the ids even if either record later changes.
pub struct Loan {
    /// Caller-assigned identifier, unique within the loan store.
    pub id: i64,
    pub book_id: i64,
    pub person_id: i64,
    /// Free-form text. The catalog never parses it.
    pub due_date: String,
    pub returned: bool,
}

impl Loan {
    /// A fresh, not-yet-returned loan.
    pub fn new(id: i64, book_id: i64, person_id: i64, due_date: impl Into<String>) -> Self {
        Self {
            id,
            book_id,
            person_id,
            due_date: due_date.into(),
            returned: false,
        }
    }

    /// An active loan is one that still holds its book.
    pub fn is_active(&self) -> bool {
        !self.returned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_loan_starts_active() {
        let loan = Loan::new(1, 1, 1, "2024-01-01");
        assert!(loan.is_active());
        assert!(!loan.returned);
    }

    #[test]
    fn display_omits_blank_parts() {
        assert_eq!(Book::new(1, "Go", "A").to_string(), "Go - A");
        assert_eq!(Book::new(2, "Go", "  ").to_string(), "Go");
        assert_eq!(Person::new(1, "Ana", "Bandung").to_string(), "Ana (Bandung)");
        assert_eq!(Person::new(2, "Ana", "").to_string(), "Ana");
    }
}
