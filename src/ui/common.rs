//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, help overlay and
//! a few small widgets the panels share.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::source::ConnectionState;

/// Render the header bar with connection state and headline counters.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let connection = app.store.connection();
    let dot_style = match connection {
        ConnectionState::Connected => Style::default().fg(app.theme.healthy),
        ConnectionState::Connecting => Style::default().fg(app.theme.warning),
        ConnectionState::Disconnected { .. } => {
            Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD)
        }
    };

    let mut spans = vec![
        Span::styled(" ● ", dot_style),
        Span::styled("SQLSCOPE ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(connection.to_string(), dot_style),
    ];

    if let ConnectionState::Disconnected { reason: Some(reason) } = connection {
        spans.push(Span::styled(
            format!(" ({})", reason),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    if let Some(status) = app.store.status() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format_count(status.total_queries),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" queries "));
        spans.push(Span::styled(
            status.active_queries.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" active"));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Title of a view's tab, without padding.
pub fn tab_title(view: View) -> String {
    format!("{}:{}", view.index() + 1, view.label())
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::ALL.iter().map(|v| Line::from(tab_title(*v))).collect();

    let tabs = Tabs::new(titles)
        .select(app.current_view.index())
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: source, time since last update, available controls.
/// Also displays temporary status messages.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::QueryFlow if app.query.editing => "Type query | Enter:run Esc:done Ctrl-C:clear",
        View::QueryFlow => "i:edit Enter:run s:sample c:clear Tab:switch ?:help q:quit",
        View::Demo => "s:start x:stop Tab:switch ?:help q:quit",
        View::Architecture | View::Performance => "r:refresh e:export Tab:switch ?:help q:quit",
    };

    let updated = match app.store.last_updated() {
        Some(at) => format!("Updated {:.1}s ago", at.elapsed().as_secs_f64()),
        None => "Waiting for data".to_string(),
    };

    let status = format!(" {} | {} | {}", app.source_description(), updated, controls);
    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  1-4         Select view"),
        Line::from("  Tab ←/→     Switch views"),
        Line::from(""),
        section(" Query Flow"),
        Line::from("  i           Edit query"),
        Line::from("  Enter x     Run query"),
        Line::from("  s           Next sample query"),
        Line::from("  c           Clear"),
        Line::from(""),
        section(" Demo"),
        Line::from("  s           Start demo"),
        Line::from("  x           Stop demo"),
        Line::from(""),
        section(" General"),
        Line::from("  r           Refresh over REST"),
        Line::from("  e           Export to JSON"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 25u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// A bordered block with the theme's border settings.
pub fn panel_block<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

/// A titled card holding one large value.
pub fn render_counter(frame: &mut Frame, app: &App, area: Rect, title: &str, value: String) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        value,
        Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD),
    )))
    .block(panel_block(app, title));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_tab_titles() {
        assert_eq!(tab_title(View::Architecture), "1:Architecture");
        assert_eq!(tab_title(View::Demo), "4:Demo");
    }
}
