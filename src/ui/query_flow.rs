//! Query Flow view: the pipeline stages, the query runner and its result.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::common::panel_block;
use super::Theme;
use crate::app::App;
use crate::data::{Stage, SAMPLE_QUERIES};
use crate::query::QueryResult;

/// Spinner frames for the running stage.
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Render the query flow view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(4), // Pipeline
        Constraint::Length(3), // Input
        Constraint::Length(6), // Samples
        Constraint::Min(6),    // Progress + result
    ])
    .split(area);

    render_pipeline(frame, app, chunks[0]);
    render_input(frame, app, chunks[1]);
    render_samples(frame, app, chunks[2]);

    let [left, right] =
        Layout::horizontal([Constraint::Length(34), Constraint::Min(20)]).areas(chunks[3]);
    render_progress(frame, app, left);
    render_result(frame, app, right);
}

fn render_pipeline(frame: &mut Frame, app: &App, area: Rect) {
    let statuses = app.query.phase.step_statuses();
    let cols = Layout::horizontal([Constraint::Ratio(1, 5); 5]).split(area);
    let spinner = SPINNER[(app.frame_count % SPINNER.len() as u64) as usize];

    for ((stage, status), col) in Stage::ALL.iter().zip(statuses).zip(cols.iter()) {
        let style = Theme::step_style(status);
        let marker = match status {
            crate::data::StepStatus::Running => spinner,
            crate::data::StepStatus::Completed => "✓",
            crate::data::StepStatus::Failed => "✗",
            crate::data::StepStatus::Pending => "·",
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(stage.label(), style)),
            Line::from(Span::styled(format!("{} {}", marker, status.label()), style)),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(style),
        );
        frame.render_widget(paragraph, *col);
    }
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let (title, border) = if app.query.editing {
        (" Query (editing) ", Style::default().fg(app.theme.highlight))
    } else {
        (" Query ", Style::default().fg(app.theme.border))
    };
    let mut spans = vec![Span::raw(app.query.input.as_str())];
    if app.query.editing {
        spans.push(Span::styled("█", Style::default().fg(app.theme.highlight)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(border),
    );
    frame.render_widget(paragraph, area);
}

fn render_samples(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = SAMPLE_QUERIES
        .iter()
        .enumerate()
        .map(|(i, sql)| {
            let style = if app.query.input == *sql {
                Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            Line::from(Span::styled(format!(" {}. {}", i + 1, sql), style))
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(panel_block(app, " Sample Queries (s: next) ")),
        area,
    );
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = app
        .query
        .phase
        .messages()
        .iter()
        .map(|m| Line::from(format!(" ✓ {}", m)))
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            " Press Enter to run the query",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }

    if let Some(event) = app.store.last_query_event() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Last execution event", app.theme.header)));
        lines.push(Line::from(format!(" {} {}", event.query_id, event.status)));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block(app, " Execution Steps ")),
        area,
    );
}

fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(ref error) = app.query.error {
        let paragraph = Paragraph::new(format!("Error: {}", error))
            .style(Style::default().fg(app.theme.critical))
            .wrap(Wrap { trim: true })
            .block(panel_block(app, " Result "));
        frame.render_widget(paragraph, area);
        return;
    }

    let Some(ref result) = app.query.result else {
        let hint = if app.query.phase.is_running() {
            "Executing..."
        } else {
            "No result yet"
        };
        let paragraph = Paragraph::new(hint)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(panel_block(app, " Result "));
        frame.render_widget(paragraph, area);
        return;
    };

    let block = panel_block(app, " Result ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [summary, table_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);
    frame.render_widget(Paragraph::new(summary_line(app, result)), summary);
    frame.render_widget(result_table(app, result), table_area);
}

fn summary_line<'a>(app: &App, result: &'a QueryResult) -> Line<'a> {
    let label = Style::default().add_modifier(Modifier::DIM);
    let value = Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("Query ID: ", label),
        Span::styled(result.query_id.as_str(), value),
        Span::styled("  Execution Time: ", label),
        Span::styled(format!("{}ms", result.execution_time_ms), value),
        Span::styled("  Rows Returned: ", label),
        Span::styled(result.rows_returned.to_string(), value),
    ])
}

/// Result rows with generated "Column N" headers.
fn result_table<'a>(app: &App, result: &'a QueryResult) -> Table<'a> {
    let columns = result.column_count();
    let header = Row::new((1..=columns).map(|i| Cell::from(format!("Column {}", i))))
        .style(app.theme.header);
    let rows = result
        .results
        .iter()
        .map(|row| Row::new(row.values.iter().map(|v| Cell::from(v.as_str()))));
    let widths = vec![Constraint::Fill(1); columns.max(1)];
    Table::new(rows, widths).header(header).column_spacing(2)
}
