use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{Book, Loan, Person};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error. Catalog
/// errors sit at the bottom of the chain and already read like sentences.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Render `[key] action` pairs for the footer.
pub(crate) fn key_hints(hints: &[(&str, &str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, action) in hints {
        spans.push(Span::styled(format!("[{key}]"), key_style));
        spans.push(Span::raw(format!(" {action}   ")));
    }
    Line::from(spans)
}

pub(crate) fn book_line(book: &Book, on_loan: bool) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!("#{:<4} ", book.id),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(book.to_string()),
    ];
    if on_loan {
        spans.push(Span::styled("  [on loan]", Style::default().fg(Color::Magenta)));
    }
    Line::from(spans)
}

pub(crate) fn person_line(person: &Person, loaning: bool) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!("#{:<4} ", person.id),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(person.to_string()),
    ];
    if loaning {
        spans.push(Span::styled(
            "  [borrowing]",
            Style::default().fg(Color::Magenta),
        ));
    }
    Line::from(spans)
}

/// Loan row with the book title and borrower name resolved when they still
/// exist. Deleted references show up as `missing`.
pub(crate) fn loan_line(loan: &Loan, book: Option<&Book>, person: Option<&Person>) -> Line<'static> {
    let book_text = match book {
        Some(book) => format!("Book {} ({})", loan.book_id, book.title),
        None => format!("Book {} (missing)", loan.book_id),
    };
    let person_text = match person {
        Some(person) => format!("Person {} ({})", loan.person_id, person.name),
        None => format!("Person {} (missing)", loan.person_id),
    };
    let due = if loan.due_date.trim().is_empty() {
        "no due date".to_string()
    } else {
        format!("due {}", loan.due_date)
    };
    let (state, state_style) = if loan.returned {
        ("returned", Style::default().fg(Color::DarkGray))
    } else {
        ("active", Style::default().fg(Color::Green))
    };

    Line::from(vec![
        Span::styled(
            format!("#{:<4} ", loan.id),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(format!("{book_text} -> {person_text}, {due}  ")),
        Span::styled(state, state_style),
    ])
}
