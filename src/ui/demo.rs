//! Demo view: controls, step progress, canned query results and the
//! concept notes.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Wrap},
    Frame,
};

use super::common::panel_block;
use crate::app::App;
use crate::data::demo::{CONCEPTS, TECHNOLOGY};
use crate::data::DEMO_STEPS;

/// Pulse frames cycled while the demo runs.
const PULSE: [&str; 4] = ["·", "•", "●", "•"];

/// Render the demo view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let running = app.demo.state.is_running();
    let chunks = Layout::vertical([
        Constraint::Length(3),                           // Controls
        Constraint::Length(if running { 5 } else { 0 }), // Progress
        Constraint::Min(4),                              // Results
        Constraint::Length(CONCEPTS.len() as u16 * 3 + 2), // Concepts
    ])
    .split(area);

    render_controls(frame, app, chunks[0]);
    if running {
        render_progress(frame, app, chunks[1]);
    }
    render_results(frame, app, chunks[2]);
    render_concepts(frame, app, chunks[3]);
}

/// The pulse glyph for the current animation frame.
pub fn pulse(frame_count: u64) -> &'static str {
    PULSE[(frame_count % PULSE.len() as u64) as usize]
}

fn render_controls(frame: &mut Frame, app: &App, area: Rect) {
    let running = app.demo.state.is_running();
    let enabled = Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD);
    let disabled = Style::default().add_modifier(Modifier::DIM);

    let line = if running {
        Line::from(vec![
            Span::styled(
                format!(" {} ", pulse(app.frame_count)),
                Style::default().fg(app.theme.healthy),
            ),
            Span::styled("Running Demo...", disabled),
            Span::raw("   "),
            Span::styled(
                "[x] Stop Demo",
                Style::default()
                    .fg(app.theme.critical)
                    .add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(vec![
            Span::raw("   "),
            Span::styled("[s] Start Demo", enabled),
            Span::raw("   "),
            Span::styled("[x] Stop Demo", disabled),
        ])
    };

    frame.render_widget(
        Paragraph::new(line).block(panel_block(app, " Interactive Demo ")),
        area,
    );
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let Some(step) = app.demo.state.step() else {
        return;
    };
    let index = DEMO_STEPS.iter().position(|s| s == step).unwrap_or(0);

    let block = panel_block(app, " Progress ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [gauge_area, title_area, desc_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(app.theme.highlight))
        .ratio(app.demo.state.progress())
        .label(format!("Step {}/{}", index + 1, DEMO_STEPS.len()));
    frame.render_widget(gauge, gauge_area);
    frame.render_widget(
        Paragraph::new(Span::styled(step.title, app.theme.header)),
        title_area,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            step.description,
            Style::default().add_modifier(Modifier::DIM),
        )),
        desc_area,
    );
}

fn render_results(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, " Demo Query Results ");
    if app.demo.results.is_empty() {
        let hint = if app.demo.state.is_running() {
            "Queries run during the Query Execution step"
        } else {
            "Press s to start the demo"
        };
        frame.render_widget(
            Paragraph::new(hint)
                .style(Style::default().add_modifier(Modifier::DIM))
                .block(block),
            area,
        );
        return;
    }

    let label = Style::default().add_modifier(Modifier::DIM);
    let mut lines = Vec::new();
    for (i, (query, result)) in app.demo.results.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("Query {}: {}", i + 1, query.description),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(format!("  {}", query.sql), label)));
        lines.push(Line::from(vec![
            Span::styled("  Rows Returned: ", label),
            Span::raw(result.rows_returned.to_string()),
            Span::styled("  Execution Time: ", label),
            Span::raw(format!("{}ms", result.execution_time_ms)),
        ]));
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn render_concepts(frame: &mut Frame, app: &App, area: Rect) {
    let [concepts, stack] =
        Layout::horizontal([Constraint::Ratio(3, 5), Constraint::Ratio(2, 5)]).areas(area);

    let notes = |entries: &[(&'static str, &'static str)]| -> Vec<Line<'static>> {
        entries
            .iter()
            .flat_map(|(heading, text)| {
                [
                    Line::from(Span::styled(
                        *heading,
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(*text, Style::default().add_modifier(Modifier::DIM))),
                ]
            })
            .collect()
    };

    frame.render_widget(
        Paragraph::new(notes(&CONCEPTS))
            .wrap(Wrap { trim: true })
            .block(panel_block(app, " Distributed Systems Concepts ")),
        concepts,
    );
    frame.render_widget(
        Paragraph::new(notes(&TECHNOLOGY))
            .wrap(Wrap { trim: true })
            .block(panel_block(app, " Technology Stack ")),
        stack,
    );
}
