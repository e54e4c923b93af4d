use std::mem;

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::Entity;
use crate::models::{Book, Loan, Person};

use super::forms::{ConfirmDelete, RecordForm};
use super::helpers::{book_line, centered_rect, key_hints, loan_line, person_line, surface_error};
use super::screens::{ListScreen, Tab};

/// Height of the tab strip at the top of the screen.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp / PageDown.
const PAGE_STEP: isize = 5;

/// Fine-grained modes scoped to the current tab.
enum Mode {
    Normal,
    Adding(RecordForm),
    Editing(RecordForm),
    ConfirmDelete(ConfirmDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. The lists are snapshots
/// refreshed from the catalog after every successful change.
pub struct App {
    catalog: Catalog,
    tab: Tab,
    books: ListScreen<Book>,
    persons: ListScreen<Person>,
    loans: ListScreen<Loan>,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(catalog: Catalog) -> Result<Self> {
        let books = catalog.list_books().context("failed to load books")?;
        let persons = catalog.list_persons().context("failed to load persons")?;
        let loans = catalog.list_loans().context("failed to load loans")?;
        Ok(Self {
            catalog,
            tab: Tab::Books,
            books: ListScreen::new(books),
            persons: ListScreen::new(persons),
            loans: ListScreen::new(loans),
            mode: Mode::Normal,
            status: None,
        })
    }

    #[cfg(test)]
    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Feed one key press through the current mode. Returns `true` once the
    /// user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Adding(form) => self.handle_form(code, form, false)?,
            Mode::Editing(form) => self.handle_form(code, form, true)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Tab | KeyCode::Right => self.switch_tab(self.tab.next()),
            KeyCode::BackTab | KeyCode::Left => self.switch_tab(self.tab.previous()),
            KeyCode::Char('1') => self.switch_tab(Tab::Books),
            KeyCode::Char('2') => self.switch_tab(Tab::Persons),
            KeyCode::Char('3') => self.switch_tab(Tab::Loans),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.move_selection(PAGE_STEP),
            KeyCode::Home => match self.tab {
                Tab::Books => self.books.select_first(),
                Tab::Persons => self.persons.select_first(),
                Tab::Loans => self.loans.select_first(),
            },
            KeyCode::End => match self.tab {
                Tab::Books => self.books.select_last(),
                Tab::Persons => self.persons.select_last(),
                Tab::Loans => self.loans.select_last(),
            },
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::Adding(RecordForm::blank(self.tab.entity())));
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(form) = self.edit_form_for_selection() {
                    self.clear_status();
                    return Ok(Mode::Editing(form));
                }
                self.set_status("Nothing selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(confirm) = self.confirm_for_selection() {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(confirm));
                }
                self.set_status("Nothing selected to delete.", StatusKind::Error);
            }
            KeyCode::Char('r') | KeyCode::Char('R') if self.tab == Tab::Loans => {
                self.toggle_returned()?;
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_form(&mut self, code: KeyCode, mut form: RecordForm, editing: bool) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                let verb = if editing { "Edit" } else { "Add" };
                self.set_status(format!("{verb} cancelled."), StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.submit_form(&form, editing) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if !keep_open {
            Ok(Mode::Normal)
        } else if editing {
            Ok(Mode::Editing(form))
        } else {
            Ok(Mode::Adding(form))
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        // A blocked delete is an answer, not a reason to keep
                        // the dialog open.
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::Normal)
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn submit_form(&mut self, form: &RecordForm, editing: bool) -> Result<()> {
        match (form.entity, editing) {
            (Entity::Book, false) => {
                let book = form.parse_book()?;
                self.catalog
                    .add_book(&book)
                    .context("failed to store book")?;
                self.reload(Some(book.id))?;
                self.set_status(format!("Book {} added.", book.id), StatusKind::Info);
            }
            (Entity::Book, true) => {
                let book = form.parse_book()?;
                self.catalog
                    .update_book(&book)
                    .context("failed to update book")?;
                self.reload(Some(book.id))?;
                self.set_status(format!("Book {} updated.", book.id), StatusKind::Info);
            }
            (Entity::Person, false) => {
                let person = form.parse_person()?;
                self.catalog
                    .add_person(&person)
                    .context("failed to store person")?;
                self.reload(Some(person.id))?;
                self.set_status(format!("Person {} added.", person.id), StatusKind::Info);
            }
            (Entity::Person, true) => {
                let person = form.parse_person()?;
                self.catalog
                    .update_person(&person)
                    .context("failed to update person")?;
                self.reload(Some(person.id))?;
                self.set_status(format!("Person {} updated.", person.id), StatusKind::Info);
            }
            (Entity::Loan, false) => {
                let loan = form.parse_loan()?;
                let loan = self
                    .catalog
                    .add_loan(&loan)
                    .context("failed to add loan")?;
                self.reload(Some(loan.id))?;
                self.set_status(format!("Loan {} added.", loan.id), StatusKind::Info);
            }
            (Entity::Loan, true) => {
                let loan = form.parse_loan()?;
                self.catalog
                    .update_loan(&loan)
                    .context("failed to update loan")?;
                self.reload(Some(loan.id))?;
                self.set_status(format!("Loan {} updated.", loan.id), StatusKind::Info);
            }
        }
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        let deleted = match confirm.entity {
            Entity::Book => self.catalog.delete_book(confirm.id),
            Entity::Person => self.catalog.delete_person(confirm.id),
            Entity::Loan => self.catalog.delete_loan(confirm.id),
        };
        deleted.with_context(|| format!("failed to delete {} {}", confirm.entity, confirm.id))?;

        self.reload(None)?;
        self.set_status(
            format!("{} {} deleted.", confirm.entity, confirm.id),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Return the selected loan, or re-open it when it was already returned.
    fn toggle_returned(&mut self) -> Result<()> {
        let Some(loan) = self.loans.current().cloned() else {
            self.set_status("No loan selected.", StatusKind::Error);
            return Ok(());
        };

        let outcome = if loan.returned {
            let reopened = Loan {
                returned: false,
                ..loan.clone()
            };
            self.catalog
                .update_loan(&reopened)
                .map(|()| format!("Loan {} re-opened.", loan.id))
        } else {
            self.catalog
                .return_loan(loan.id)
                .map(|_| format!("Loan {} returned.", loan.id))
        };

        match outcome {
            Ok(message) => {
                self.reload(Some(loan.id))?;
                self.set_status(message, StatusKind::Info);
            }
            Err(err) => self.set_status(err.to_string(), StatusKind::Error),
        }
        Ok(())
    }

    /// Pull fresh snapshots of every table. `focus_id` keeps the cursor on
    /// the record just touched in the active tab.
    fn reload(&mut self, focus_id: Option<i64>) -> Result<()> {
        let focus = |tab: Tab| if tab == self.tab { focus_id } else { None };
        let (books_focus, persons_focus, loans_focus) =
            (focus(Tab::Books), focus(Tab::Persons), focus(Tab::Loans));

        self.books.replace(
            self.catalog.list_books().context("failed to load books")?,
            books_focus,
        );
        self.persons.replace(
            self.catalog.list_persons().context("failed to load persons")?,
            persons_focus,
        );
        self.loans.replace(
            self.catalog.list_loans().context("failed to load loans")?,
            loans_focus,
        );
        debug!(
            books = self.books.items.len(),
            persons = self.persons.items.len(),
            loans = self.loans.items.len(),
            "reloaded catalog snapshots"
        );
        Ok(())
    }

    fn switch_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.clear_status();
        }
    }

    fn move_selection(&mut self, offset: isize) {
        match self.tab {
            Tab::Books => self.books.move_selection(offset),
            Tab::Persons => self.persons.move_selection(offset),
            Tab::Loans => self.loans.move_selection(offset),
        }
    }

    fn edit_form_for_selection(&self) -> Option<RecordForm> {
        match self.tab {
            Tab::Books => self.books.current().map(RecordForm::from_book),
            Tab::Persons => self.persons.current().map(RecordForm::from_person),
            Tab::Loans => self.loans.current().map(RecordForm::from_loan),
        }
    }

    fn confirm_for_selection(&self) -> Option<ConfirmDelete> {
        let (id, summary) = match self.tab {
            Tab::Books => self.books.current().map(|b| (b.id, b.to_string()))?,
            Tab::Persons => self.persons.current().map(|p| (p.id, p.to_string()))?,
            Tab::Loans => self.loans.current().map(|l| {
                (
                    l.id,
                    format!("book {} lent to person {}", l.book_id, l.person_id),
                )
            })?,
        };
        Some(ConfirmDelete {
            entity: self.tab.entity(),
            id,
            summary,
        })
    }

    fn book_on_loan(&self, book_id: i64) -> bool {
        self.loans
            .items
            .iter()
            .any(|loan| loan.is_active() && loan.book_id == book_id)
    }

    fn person_loaning(&self, person_id: i64) -> bool {
        self.loans
            .items
            .iter()
            .any(|loan| loan.is_active() && loan.person_id == person_id)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            Tab::Books => self.draw_books(frame, chunks[1]),
            Tab::Persons => self.draw_persons(frame, chunks[1]),
            Tab::Loans => self.draw_loans(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Adding(form) => {
                let title = format!("Add {}", form.entity);
                self.draw_form(frame, area, &title, form);
            }
            Mode::Editing(form) => {
                let title = format!("Edit {}", form.entity);
                self.draw_form(frame, area, &title, form);
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Tab::ALL
            .iter()
            .map(|tab| Line::from(format!("{} {}", tab.index() + 1, tab.title())))
            .collect();
        let tabs = Tabs::new(titles)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Library Catalog"),
            )
            .select(self.tab.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .books
            .items
            .iter()
            .map(|book| ListItem::new(book_line(book, self.book_on_loan(book.id))))
            .collect();
        self.render_list(frame, area, "Books", items, self.books.selected);
    }

    fn draw_persons(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .persons
            .items
            .iter()
            .map(|person| ListItem::new(person_line(person, self.person_loaning(person.id))))
            .collect();
        self.render_list(frame, area, "Persons", items, self.persons.selected);
    }

    fn draw_loans(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .loans
            .items
            .iter()
            .map(|loan| {
                let book = self.books.items.iter().find(|b| b.id == loan.book_id);
                let person = self.persons.items.iter().find(|p| p.id == loan.person_id);
                ListItem::new(loan_line(loan, book, person))
            })
            .collect();
        self.render_list(frame, area, "Loans", items, self.loans.selected);
    }

    fn render_list(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        items: Vec<ListItem>,
        selected: usize,
    ) {
        let block = Block::default().borders(Borders::ALL).title(title.to_string());
        if items.is_empty() {
            let message = Paragraph::new(format!(
                "No {} yet. Press '+' to add one.",
                title.to_lowercase()
            ))
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(message, area);
            return;
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.mode, self.tab) {
            (Mode::Adding(_) | Mode::Editing(_), _) => key_hints(&[
                ("Enter", "Save"),
                ("Tab/↑↓", "Switch field"),
                ("Esc", "Cancel"),
            ]),
            (Mode::ConfirmDelete(_), _) => key_hints(&[("Y", "Delete"), ("N/Esc", "Cancel")]),
            (Mode::Normal, Tab::Loans) => key_hints(&[
                ("←→", "Tabs"),
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Delete"),
                ("r", "Return/Re-open"),
                ("q", "Quit"),
            ]),
            (Mode::Normal, _) => key_hints(&[
                ("←→", "Tabs"),
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Delete"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &RecordForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(title.to_string())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|idx| form.build_line(idx))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + form.cursor_offset() as u16;
        let cursor_y = inner.y + form.active as u16;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![Line::from(format!(
            "Delete {} {} ({})?",
            confirm.entity, confirm.id, confirm.summary
        ))];
        if confirm.entity != Entity::Loan {
            lines.push(Line::from(format!(
                "Active loans: {}.",
                self.catalog.delete_policy()
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
