//! Surface interpretation: abstract widget surfaces to terminal cells.
//!
//! The widget floats over whatever the host renders underneath. Open, it
//! occupies a fixed-size rect in its configured corner; closed, it shrinks to
//! a dock icon that lights up while a call is ringing.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use calldock_app::{CallWidget, Corner};
use calldock_core::surface::Surface;

use crate::theme;

/// Open widget footprint.
pub const WIDGET_WIDTH: u16 = 46;
pub const WIDGET_HEIGHT: u16 = 16;

/// Dock icon footprint.
const DOCK_WIDTH: u16 = 14;
const DOCK_HEIGHT: u16 = 3;

/// Anchor a fixed-size rect in a corner of `area`, clamped to fit.
pub fn corner_rect(area: Rect, corner: Corner, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = match corner {
        Corner::TopLeft | Corner::BottomLeft => area.x,
        Corner::TopRight | Corner::BottomRight => area.x + area.width - w,
    };
    let y = match corner {
        Corner::TopLeft | Corner::TopRight => area.y,
        Corner::BottomLeft | Corner::BottomRight => area.y + area.height - h,
    };
    Rect::new(x, y, w, h)
}

/// Render the widget into its corner of the frame.
pub fn view(frame: &mut Frame, widget: &CallWidget) {
    let area = frame.area();
    if !widget.is_open() {
        render_dock(frame, area, widget);
        return;
    }

    let rect = corner_rect(area, widget.corner(), WIDGET_WIDTH, WIDGET_HEIGHT);
    frame.render_widget(Clear, rect);
    for layer in widget.surface().layers() {
        render_surface(frame, rect, &layer);
    }
}

/// The closed widget's dock icon.
fn render_dock(frame: &mut Frame, area: Rect, widget: &CallWidget) {
    let rect = corner_rect(area, widget.corner(), DOCK_WIDTH, DOCK_HEIGHT);
    frame.render_widget(Clear, rect);
    let (label, style) = if widget.is_ringing() {
        ("☎ ringing", theme::ringing())
    } else {
        ("☎ calldock", theme::text_muted())
    };
    let icon = Paragraph::new(Line::styled(label, style))
        .alignment(Alignment::Center)
        .block(theme::dock());
    frame.render_widget(icon, rect);
}

fn render_surface(frame: &mut Frame, rect: Rect, surface: &Surface) {
    match surface {
        Surface::None | Surface::Stack { .. } => {}
        Surface::Panel {
            title,
            body,
            footer,
        } => render_panel(frame, rect, title, body, footer.as_deref()),
        Surface::Form {
            title,
            fields,
            submit_label,
            error,
        } => render_form(frame, rect, title, fields, submit_label, error.as_deref()),
        Surface::List {
            title,
            items,
            selected,
            loading_more,
            empty_hint,
        } => render_list(frame, rect, title, items, *selected, *loading_more, empty_hint),
        Surface::CallFace {
            remote,
            state_line,
            duration,
            muted,
            video_on,
            controls,
        } => render_call_face(
            frame,
            rect,
            remote,
            state_line,
            duration.as_deref(),
            *muted,
            *video_on,
            controls,
        ),
        Surface::Toast { text } => render_toast(frame, rect, text),
        Surface::Menu { items, selected } => render_menu(frame, rect, items, *selected),
    }
}

fn render_panel(frame: &mut Frame, rect: Rect, title: &str, body: &[String], footer: Option<&str>) {
    let block = theme::pane(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let mut lines: Vec<Line> = body
        .iter()
        .map(|text| Line::styled(text.clone(), theme::text_primary()))
        .collect();
    if let Some(footer) = footer {
        while (lines.len() as u16) + 1 < inner.height {
            lines.push(Line::raw(""));
        }
        lines.push(Line::styled(footer.to_string(), theme::text_muted()));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_form(
    frame: &mut Frame,
    rect: Rect,
    title: &str,
    fields: &[calldock_core::surface::FormField],
    submit_label: &str,
    error: Option<&str>,
) {
    let block = theme::pane(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let mut lines: Vec<Line> = Vec::new();
    for field in fields {
        let marker = if field.active { "▸ " } else { "  " };
        let value_style = if field.active {
            theme::text_primary()
        } else {
            theme::text_secondary()
        };
        let cursor = if field.active { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(marker, theme::accent()),
            Span::styled(format!("{}: ", field.label), theme::text_secondary()),
            Span::styled(format!("{}{cursor}", field.display_value()), value_style),
        ]));
    }
    lines.push(Line::raw(""));
    if let Some(error) = error {
        lines.push(Line::styled(error.to_string(), theme::error()));
    }
    lines.push(Line::styled(submit_label.to_string(), theme::text_muted()));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_list(
    frame: &mut Frame,
    rect: Rect,
    title: &str,
    items: &[calldock_core::surface::RowItem],
    selected: Option<usize>,
    loading_more: bool,
    empty_hint: &str,
) {
    let block = theme::pane(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    if items.is_empty() {
        let hint = if loading_more { "Loading…" } else { empty_hint };
        frame.render_widget(
            Paragraph::new(Line::styled(hint.to_string(), theme::text_muted())),
            inner,
        );
        return;
    }

    let rows: Vec<ListItem> = items
        .iter()
        .map(|row| {
            let style = if row.dim {
                theme::text_muted()
            } else {
                theme::text_primary()
            };
            let mut spans = vec![Span::styled(row.primary.clone(), style)];
            if !row.secondary.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", row.secondary),
                    theme::text_muted(),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(rows).highlight_style(theme::selection());
    let mut state = ListState::default();
    state.select(selected);
    frame.render_stateful_widget(list, inner, &mut state);

    if loading_more && inner.height > 0 {
        let status = Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1);
        frame.render_widget(
            Paragraph::new(Line::styled("Loading…", theme::text_muted())),
            status,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn render_call_face(
    frame: &mut Frame,
    rect: Rect,
    remote: &str,
    state_line: &str,
    duration: Option<&str>,
    muted: bool,
    video_on: bool,
    controls: &[(String, String)],
) {
    let block = theme::pane("Call");
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let media = format!(
        "mic {} · cam {}",
        if muted { "off" } else { "on" },
        if video_on { "on" } else { "off" },
    );
    let mut lines = vec![
        Line::raw(""),
        Line::styled(remote.to_string(), theme::title()),
        Line::styled(state_line.to_string(), theme::text_secondary()),
    ];
    match duration {
        Some(duration) => lines.push(Line::styled(duration.to_string(), theme::live())),
        None => lines.push(Line::raw("")),
    }
    lines.push(Line::styled(media, theme::text_muted()));

    let legend = controls
        .iter()
        .map(|(key, label)| format!("[{key}] {label}"))
        .collect::<Vec<_>>()
        .join("  ");
    while (lines.len() as u16) + 1 < inner.height {
        lines.push(Line::raw(""));
    }
    lines.push(Line::styled(legend, theme::text_muted()));

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn render_toast(frame: &mut Frame, rect: Rect, text: &str) {
    if rect.height < 3 {
        return;
    }
    // One-line band just above the widget's bottom border.
    let band = Rect::new(rect.x + 1, rect.y + rect.height - 2, rect.width - 2, 1);
    frame.render_widget(Clear, band);
    frame.render_widget(
        Paragraph::new(Line::styled(format!(" {text} "), theme::toast()))
            .alignment(Alignment::Center)
            .style(Style::default().bg(theme::TOAST_BG)),
        band,
    );
}

fn render_menu(frame: &mut Frame, rect: Rect, items: &[String], selected: usize) {
    if rect.height < 3 {
        return;
    }
    // Menu band sits at the bottom of the widget, above the toast line.
    let height = (items.len() as u16).min(rect.height - 2);
    let band = Rect::new(
        rect.x + 1,
        rect.y + rect.height - 1 - height,
        rect.width - 2,
        height,
    );
    let rows: Vec<ListItem> = items
        .iter()
        .map(|item| ListItem::new(Line::styled(item.clone(), theme::text_secondary())))
        .collect();
    let list = List::new(rows).highlight_style(theme::selection());
    let mut state = ListState::default();
    state.select(Some(selected));
    frame.render_widget(Clear, band);
    frame.render_stateful_widget(list, band, &mut state);
}
