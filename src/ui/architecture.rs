//! Architecture view: the coordinator/worker topology, a card per reported
//! component and the system counters.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::common::{panel_block, render_counter};
use crate::app::App;
use crate::source::{ComponentStatus, Health};

/// Id of the coordinator component.
pub const COORDINATOR: &str = "coordinator";

/// Workers always drawn in the topology, whether or not they report.
pub const WORKERS: [&str; 3] = ["worker1", "worker2", "worker3"];

/// Cards per row in the component grid.
const CARDS_PER_ROW: usize = 4;

/// Render the architecture view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(12), // Topology
        Constraint::Min(6),     // Component cards
        Constraint::Length(3),  // Counters
    ])
    .split(area);

    render_topology(frame, app, chunks[0]);
    render_components(frame, app, chunks[1]);
    render_counters(frame, app, chunks[2]);
}

fn health_of(app: &App, id: &str) -> Option<Health> {
    app.store.status()?.component(id).map(|c| c.status)
}

/// A node box: name on top, health badge below.
fn node<'a>(app: &App, name: &'a str, health: Option<Health>) -> Paragraph<'a> {
    let style = app.theme.health_style(health);
    let badge = health.map(|h| h.label()).unwrap_or("unknown");
    Paragraph::new(vec![
        Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(format!("● {}", badge), style)),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(style),
    )
}

fn render_topology(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, " System Architecture ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical([
        Constraint::Length(4), // Coordinator
        Constraint::Length(2), // Links
        Constraint::Length(4), // Workers
    ])
    .split(inner);

    let coordinator = health_of(app, COORDINATOR);
    let [_, center, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(20),
        Constraint::Fill(1),
    ])
    .areas(rows[0]);
    frame.render_widget(node(app, "Coordinator", coordinator), center);

    let link_cols = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(rows[1]);
    let worker_cols = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(rows[2]);

    for (i, worker) in WORKERS.iter().enumerate() {
        let health = health_of(app, worker);
        let link_style = app.theme.link_style(coordinator, health);
        let link = Paragraph::new(vec![
            Line::from(Span::styled("│", link_style)),
            Line::from(Span::styled("▼", link_style)),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(link, link_cols[i]);

        let [_, col, _] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(18),
            Constraint::Fill(1),
        ])
        .areas(worker_cols[i]);
        frame.render_widget(node(app, worker, health), col);
    }
}

fn component_card<'a>(app: &App, component: &'a ComponentStatus) -> Paragraph<'a> {
    let label = Style::default().add_modifier(Modifier::DIM);
    let lines = vec![
        Line::from(vec![
            Span::styled("Status:      ", label),
            Span::styled(component.status.label(), app.theme.health_style(Some(component.status))),
        ]),
        Line::from(vec![
            Span::styled("CPU:         ", label),
            Span::raw(format!("{:.1}%", component.cpu_usage)),
        ]),
        Line::from(vec![
            Span::styled("Memory:      ", label),
            Span::raw(format!("{:.1}%", component.memory_usage)),
        ]),
        Line::from(vec![
            Span::styled("Connections: ", label),
            Span::raw(component.active_connections.to_string()),
        ]),
    ];
    Paragraph::new(lines).block(
        Block::default()
            .title(format!(" {} ", component.id))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    )
}

fn render_components(frame: &mut Frame, app: &App, area: Rect) {
    let components: Vec<&ComponentStatus> = app
        .store
        .status()
        .map(|s| s.components.values().collect())
        .unwrap_or_default();

    if components.is_empty() {
        let message = Paragraph::new("Waiting for system status...")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(panel_block(app, " Components "));
        frame.render_widget(message, area);
        return;
    }

    let rows: Vec<&[&ComponentStatus]> = components.chunks(CARDS_PER_ROW).collect();
    let row_areas = Layout::vertical(vec![Constraint::Length(6); rows.len()]).split(area);

    for (row, row_area) in rows.iter().zip(row_areas.iter()) {
        let cols = Layout::horizontal(vec![
            Constraint::Ratio(1, CARDS_PER_ROW as u32);
            CARDS_PER_ROW
        ])
        .split(*row_area);
        for (component, col) in row.iter().zip(cols.iter()) {
            frame.render_widget(component_card(app, component), *col);
        }
    }
}

fn render_counters(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.store.status();
    let total = status.map(|s| s.total_queries).unwrap_or(0);
    let active = status.map(|s| s.active_queries).unwrap_or(0);
    let uptime = status.map(|s| s.system_uptime).unwrap_or(0);

    let cols = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(area);
    render_counter(frame, app, cols[0], " Total Queries ", total.to_string());
    render_counter(frame, app, cols[1], " Active Queries ", active.to_string());
    render_counter(frame, app, cols[2], " System Uptime ", format_uptime(uptime));
}

/// Uptime in whole minutes.
pub fn format_uptime(seconds: u64) -> String {
    format!("{}m", seconds / 60)
}
