// Diff Table Component
// Renders the comparison records of one directory pair

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::core::Session;
use crate::operations::{DiffRecord, PairDiff};
use super::Styles;

/// Column titles and widths, shared with the plain-text report
pub const COLUMNS: [(&str, u16); 4] = [
    ("Status", 20),
    ("Path", 45),
    ("Source hash", 33),
    ("Destination hash", 33),
];

/// Label for the status column; paths being repaired read `Syncing`
pub fn status_label(record: &DiffRecord, syncing: bool) -> &'static str {
    if syncing {
        "Syncing"
    } else {
        record.status.label()
    }
}

/// Render the table for the current pair
pub fn render_diff_table(f: &mut Frame, session: &Session, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Styles::border())
        .title(Span::styled("Differences", Styles::title()));

    let Some(diff) = session.current_diff() else {
        render_message(f, block, area, "No directory pairs configured", Styles::placeholder());
        return;
    };

    let records = match diff {
        PairDiff::Pending => {
            render_message(f, block, area, "Computing differences...", Styles::loading());
            return;
        }
        PairDiff::Failed(message) => {
            let text = format!("Error retrieving diff: {}", message);
            render_message(f, block, area, &text, Styles::error());
            return;
        }
        PairDiff::Ready(records) if records.is_empty() => {
            render_message(f, block, area, "Both trees are empty", Styles::placeholder());
            return;
        }
        PairDiff::Ready(records) => records,
    };

    let pair_index = session.current_index();
    let rows: Vec<Row> = records
        .iter()
        .skip(session.scroll_offset())
        .map(|record| {
            let syncing = session.is_syncing(pair_index, &record.path);
            let status_style = if syncing {
                Styles::status_syncing()
            } else {
                Styles::status(record.status)
            };
            Row::new(vec![
                Cell::from(status_label(record, syncing)).style(status_style),
                Cell::from(record.path.as_str()),
                Cell::from(record.source_hash_str()).style(Styles::hash()),
                Cell::from(record.destination_hash_str()).style(Styles::hash()),
            ])
        })
        .collect();

    let header = Row::new(COLUMNS.iter().map(|(title, _)| Cell::from(*title)))
        .style(Styles::table_header());
    let widths = COLUMNS.iter().map(|(_, width)| Constraint::Length(*width));

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block);
    f.render_widget(table, area);
}

fn render_message(f: &mut Frame, block: Block, area: Rect, text: &str, style: Style) {
    let paragraph = Paragraph::new(Line::from(Span::styled(text.to_string(), style))).block(block);
    f.render_widget(paragraph, area);
}
