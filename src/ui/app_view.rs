// Application View
// Main application layout and rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::core::Session;
use crate::operations::DiffStatus;
use super::{render_diff_table, Styles};

pub const HELP_TEXT: &str = "tab: next pair | r: refresh | s: sync | ↑/↓: scroll | q: quit";

/// Render the entire application
pub fn render_app(f: &mut Frame, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    render_header(f, session, chunks[0]);
    render_diff_table(f, session, chunks[1]);
    render_footer(f, chunks[2]);
}

/// Title line naming the current pair, e.g. `Pair 1/3 web01:/srv -> /backup`
pub fn pair_title(session: &Session) -> String {
    match session.current_pair() {
        Some(pair) => format!(
            "Pair {}/{} {} -> {}",
            session.current_index() + 1,
            session.pairs().len(),
            pair.source,
            pair.destination
        ),
        None => "No directory pairs".to_string(),
    }
}

/// Short per-status counts for the current pair
pub fn summary(session: &Session) -> Option<String> {
    let records = session.current_diff()?.records()?;
    let count = |status: DiffStatus| records.iter().filter(|r| r.status == status).count();
    let syncing = session
        .in_flight(session.current_index())
        .map_or(0, |paths| paths.len());

    let mut text = format!(
        "{} files, {} mismatched, {} missing in destination, {} missing in source",
        records.len(),
        count(DiffStatus::Mismatch),
        count(DiffStatus::MissingDestination),
        count(DiffStatus::MissingSource),
    );
    if syncing > 0 {
        text.push_str(&format!(", {} syncing", syncing));
    }
    Some(text)
}

/// Render the header bar
fn render_header(f: &mut Frame, session: &Session, area: Rect) {
    let mut spans = vec![Span::styled(pair_title(session), Styles::header())];
    if session.is_loading() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("Refreshing...", Styles::loading()));
    } else if let Some(text) = summary(session) {
        spans.push(Span::raw("  "));
        spans.push(Span::raw(text));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("tree-sync"));
    f.render_widget(header, area);
}

/// Render the footer bar
fn render_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(HELP_TEXT)
        .style(Styles::footer())
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
