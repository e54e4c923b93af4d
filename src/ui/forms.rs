use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::Entity;
use crate::models::{Book, Loan, Person};

/// One editable line inside a record form.
#[derive(Clone)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) value: String,
    /// Digits only, parsed as a positive id.
    pub(crate) numeric: bool,
    pub(crate) required: bool,
    /// Shown but not editable (the id while editing).
    pub(crate) locked: bool,
}

impl FormField {
    fn id(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            numeric: true,
            required: true,
            locked: false,
        }
    }

    fn text(label: &'static str, required: bool) -> Self {
        Self {
            label,
            value: String::new(),
            numeric: false,
            required,
            locked: false,
        }
    }

    fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}

/// Modal form state shared by the book, person and loan dialogs.
#[derive(Clone)]
pub(crate) struct RecordForm {
    pub(crate) entity: Entity,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
    /// Carried through loan edits untouched; the returned flag has its own
    /// shortcut on the loans tab.
    returned: bool,
}

impl RecordForm {
    fn new(entity: Entity, fields: Vec<FormField>) -> Self {
        let active = fields.iter().position(|f| !f.locked).unwrap_or(0);
        Self {
            entity,
            fields,
            active,
            error: None,
            returned: false,
        }
    }

    /// Empty form for a new record of the given kind.
    pub(crate) fn blank(entity: Entity) -> Self {
        let fields = match entity {
            Entity::Book => vec![
                FormField::id("Book ID"),
                FormField::text("Title", true),
                FormField::text("Author", false),
            ],
            Entity::Person => vec![
                FormField::id("Person ID"),
                FormField::text("Name", true),
                FormField::text("City", false),
            ],
            Entity::Loan => vec![
                FormField::id("Loan ID"),
                FormField::id("Book ID"),
                FormField::id("Person ID"),
                FormField::text("Due date", false),
            ],
        };
        Self::new(entity, fields)
    }

    /// Populate the form from an existing book when editing.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self::new(
            Entity::Book,
            vec![
                FormField::id("Book ID").with_value(book.id.to_string()).locked(),
                FormField::text("Title", true).with_value(book.title.clone()),
                FormField::text("Author", false).with_value(book.author.clone()),
            ],
        )
    }

    pub(crate) fn from_person(person: &Person) -> Self {
        Self::new(
            Entity::Person,
            vec![
                FormField::id("Person ID")
                    .with_value(person.id.to_string())
                    .locked(),
                FormField::text("Name", true).with_value(person.name.clone()),
                FormField::text("City", false).with_value(person.address.city.clone()),
            ],
        )
    }

    pub(crate) fn from_loan(loan: &Loan) -> Self {
        let mut form = Self::new(
            Entity::Loan,
            vec![
                FormField::id("Loan ID").with_value(loan.id.to_string()).locked(),
                FormField::id("Book ID").with_value(loan.book_id.to_string()),
                FormField::id("Person ID").with_value(loan.person_id.to_string()),
                FormField::text("Due date", false).with_value(loan.due_date.clone()),
            ],
        );
        form.returned = loan.returned;
        form
    }

    /// Move focus forward, skipping locked fields.
    pub(crate) fn next_field(&mut self) {
        self.step(1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.step(self.fields.len().saturating_sub(1));
    }

    fn step(&mut self, offset: usize) {
        let len = self.fields.len();
        if len == 0 {
            return;
        }
        let mut idx = self.active;
        for _ in 0..len {
            idx = (idx + offset) % len;
            if !self.fields[idx].locked {
                self.active = idx;
                return;
            }
        }
    }

    /// Append a character to the active field, validating allowed input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let Some(field) = self.fields.get_mut(self.active) else {
            return false;
        };
        if field.locked || ch.is_control() || (field.numeric && !ch.is_ascii_digit()) {
            return false;
        }
        field.value.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            if !field.locked {
                field.value.pop();
            }
        }
    }

    fn parse_id(&self, idx: usize) -> Result<i64> {
        let field = &self.fields[idx];
        let raw = field.value.trim();
        let subject = field.label.to_lowercase().replace(" id", " ID");
        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(anyhow!("Invalid {subject}: must be a positive integer")),
        }
    }

    fn parse_text(&self, idx: usize) -> Result<String> {
        let field = &self.fields[idx];
        let value = field.value.trim();
        if field.required && value.is_empty() {
            return Err(anyhow!("{} is required.", field.label));
        }
        Ok(value.to_string())
    }

    /// Validate and normalize inputs into a book ready for the catalog.
    pub(crate) fn parse_book(&self) -> Result<Book> {
        Ok(Book {
            id: self.parse_id(0)?,
            title: self.parse_text(1)?,
            author: self.parse_text(2)?,
        })
    }

    pub(crate) fn parse_person(&self) -> Result<Person> {
        Ok(Person::new(
            self.parse_id(0)?,
            self.parse_text(1)?,
            self.parse_text(2)?,
        ))
    }

    pub(crate) fn parse_loan(&self) -> Result<Loan> {
        Ok(Loan {
            id: self.parse_id(0)?,
            book_id: self.parse_id(1)?,
            person_id: self.parse_id(2)?,
            due_date: self.parse_text(3)?,
            returned: self.returned,
        })
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, idx: usize) -> Line<'static> {
        let field = &self.fields[idx];
        let is_active = idx == self.active;

        let display = if field.value.is_empty() {
            if field.required {
                "<required>".to_string()
            } else {
                "<optional>".to_string()
            }
        } else {
            field.value.clone()
        };

        let style = if field.locked {
            Style::default().fg(Color::Gray)
        } else if is_active {
            Style::default().fg(Color::Yellow)
        } else if field.value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column offset for the active field, label prefix included.
    pub(crate) fn cursor_offset(&self) -> usize {
        self.fields
            .get(self.active)
            .map(|f| f.label.len() + 2 + f.value.chars().count())
            .unwrap_or(0)
    }
}

/// State for confirming a delete from any of the three tabs.
#[derive(Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) entity: Entity,
    pub(crate) id: i64,
    pub(crate) summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_into(form: &mut RecordForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn book_form_trims_and_parses() {
        let mut form = RecordForm::blank(Entity::Book);
        type_into(&mut form, "12");
        form.next_field();
        type_into(&mut form, "  Go  ");
        form.next_field();
        type_into(&mut form, " A ");

        assert_eq!(form.parse_book().unwrap(), Book::new(12, "Go", "A"));
    }

    #[test]
    fn ids_must_be_positive() {
        let mut form = RecordForm::blank(Entity::Book);
        type_into(&mut form, "0");
        form.next_field();
        type_into(&mut form, "Go");

        let err = form.parse_book().unwrap_err();
        assert_eq!(err.to_string(), "Invalid book ID: must be a positive integer");
    }

    #[test]
    fn numeric_fields_reject_letters() {
        let mut form = RecordForm::blank(Entity::Loan);
        assert!(!form.push_char('x'));
        assert!(form.push_char('7'));
        assert_eq!(form.fields[0].value, "7");
    }

    #[test]
    fn required_text_is_enforced() {
        let mut form = RecordForm::blank(Entity::Person);
        type_into(&mut form, "3");
        let err = form.parse_person().unwrap_err();
        assert_eq!(err.to_string(), "Name is required.");
    }

    #[test]
    fn edit_form_locks_the_id() {
        let mut form = RecordForm::from_person(&Person::new(4, "Ana", "Bandung"));
        assert_eq!(form.active, 1);

        form.next_field();
        form.next_field();
        assert_eq!(form.active, 1, "focus wraps past the locked id");

        form.previous_field();
        assert_eq!(form.active, 2);
        form.backspace();
        form.active = 0;
        assert!(!form.push_char('9'));
        assert_eq!(form.parse_person().unwrap(), Person::new(4, "Ana", "Bandun"));
    }

    #[test]
    fn loan_edit_keeps_returned_flag() {
        let mut loan = Loan::new(1, 2, 3, "2024-01-01");
        loan.returned = true;
        let form = RecordForm::from_loan(&loan);
        assert_eq!(form.parse_loan().unwrap(), loan);
    }

    #[test]
    fn loan_form_names_the_bad_field() {
        let mut form = RecordForm::blank(Entity::Loan);
        type_into(&mut form, "1");
        form.next_field();
        type_into(&mut form, "1");

        let err = form.parse_loan().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid person ID: must be a positive integer"
        );
    }
}
