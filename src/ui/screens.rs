use std::cmp::min;

use crate::error::Entity;
use crate::models::{Book, Loan, Person};

/// The three top-level tables the user can browse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Tab {
    Books,
    Persons,
    Loans,
}

impl Tab {
    pub(crate) const ALL: [Tab; 3] = [Tab::Books, Tab::Persons, Tab::Loans];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Books => "Books",
            Tab::Persons => "Persons",
            Tab::Loans => "Loans",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tab::Books => 0,
            Tab::Persons => 1,
            Tab::Loans => 2,
        }
    }

    pub(crate) fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub(crate) fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// The store this tab edits.
    pub(crate) fn entity(self) -> Entity {
        match self {
            Tab::Books => Entity::Book,
            Tab::Persons => Entity::Person,
            Tab::Loans => Entity::Loan,
        }
    }
}

/// Anything listed on a tab carries its catalog id.
pub(crate) trait Keyed {
    fn key(&self) -> i64;
}

impl Keyed for Book {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Person {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Loan {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Snapshot of one table plus the highlighted row.
pub(crate) struct ListScreen<T> {
    pub(crate) items: Vec<T>,
    pub(crate) selected: usize,
}

impl<T: Keyed> ListScreen<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self { items, selected: 0 }
    }

    /// Swap in a fresh snapshot, keeping the selection on `focus_id` when it
    /// is still present and clamping it otherwise.
    pub(crate) fn replace(&mut self, items: Vec<T>, focus_id: Option<i64>) {
        self.items = items;
        if let Some(id) = focus_id {
            if let Some(idx) = self.items.iter().position(|item| item.key() == id) {
                self.selected = idx;
                return;
            }
        }
        self.ensure_in_bounds();
    }

    pub(crate) fn current(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.items.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.items.len() - 1;
        let next = self.selected as isize + offset;
        self.selected = min(next.max(0) as usize, last);
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }
}
