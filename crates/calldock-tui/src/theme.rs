//! Colors and semantic styles for the widget overlay.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders};

// --- Palette ---
pub const WIDGET_BG: Color = Color::Black;
pub const BORDER: Color = Color::DarkGray;
pub const BORDER_ACTIVE: Color = Color::Cyan;
pub const ACCENT: Color = Color::Cyan;
pub const TEXT_PRIMARY: Color = Color::White;
pub const TEXT_SECONDARY: Color = Color::Gray;
pub const TEXT_MUTED: Color = Color::DarkGray;
pub const RING: Color = Color::Yellow;
pub const LIVE: Color = Color::Green;
pub const ERROR: Color = Color::Red;
pub const TOAST_FG: Color = Color::Black;
pub const TOAST_BG: Color = Color::Yellow;

// --- Text styles ---
pub fn text_primary() -> Style {
    Style::default().fg(TEXT_PRIMARY)
}

pub fn text_secondary() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

pub fn text_muted() -> Style {
    Style::default().fg(TEXT_MUTED)
}

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn error() -> Style {
    Style::default().fg(ERROR)
}

pub fn live() -> Style {
    Style::default().fg(LIVE)
}

pub fn ringing() -> Style {
    Style::default().fg(RING).add_modifier(Modifier::BOLD)
}

pub fn toast() -> Style {
    Style::default().fg(TOAST_FG).bg(TOAST_BG)
}

pub fn selection() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

/// Bordered block every widget pane sits in.
pub fn pane(title_text: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACTIVE))
        .style(Style::default().bg(WIDGET_BG))
        .title(title_text.to_string())
        .title_style(title())
}

/// Border-only block for the closed dock icon.
pub fn dock() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(WIDGET_BG))
}
