// UI Styles
// Color schemes and styling for the TUI

use ratatui::style::{Color, Modifier, Style};

use crate::operations::DiffStatus;

/// Application color scheme and styles
pub struct Styles;

impl Styles {
    // === Header / Footer ===

    pub fn header() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn footer() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn loading() -> Style {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC)
    }

    // === Table ===

    pub fn table_header() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn hash() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD)
    }

    pub fn placeholder() -> Style {
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC)
    }

    // === File Status Colors ===

    pub fn status(status: DiffStatus) -> Style {
        match status {
            DiffStatus::Match => Style::default().fg(Color::Green),
            DiffStatus::MissingDestination => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            DiffStatus::Mismatch => Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            DiffStatus::MissingSource => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        }
    }

    pub fn status_syncing() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK)
    }

    // === Border Styles ===

    pub fn border() -> Style {
        Style::default().fg(Color::Cyan)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }
}
