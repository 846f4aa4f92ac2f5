//! Performance view: headline counters, trend charts and worker utilization.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table,
    },
    Frame,
};

use super::common::{panel_block, render_counter};
use crate::app::App;
use crate::data::history::SAMPLE_LABELS;
use crate::source::WorkerMetrics;

/// Render the performance view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(3),  // Counters
        Constraint::Length(12), // Trend charts
        Constraint::Min(8),     // Worker utilization
    ])
    .split(area);

    render_counters(frame, app, chunks[0]);

    let [left, right] =
        Layout::horizontal([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)]).areas(chunks[1]);
    let history = app.store.history();
    render_trend(frame, app, left, " Query Throughput ", "queries", &history.throughput_points());
    render_trend(frame, app, right, " Latency Trend ", "latency ms", &history.latency_points());

    render_workers(frame, app, chunks[2]);
}

pub fn format_latency(ms: f64) -> String {
    format!("{:.1}ms", ms)
}

pub fn format_rate(qps: f64) -> String {
    format!("{:.1}", qps)
}

/// Error rate as a percentage with two decimals.
pub fn format_error_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn render_counters(frame: &mut Frame, app: &App, area: Rect) {
    let metrics = app.store.metrics().cloned().unwrap_or_default();
    let cols = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(area);
    render_counter(frame, app, cols[0], " Total Queries ", metrics.total_queries.to_string());
    render_counter(
        frame,
        app,
        cols[1],
        " Average Latency ",
        format_latency(metrics.average_latency_ms),
    );
    render_counter(
        frame,
        app,
        cols[2],
        " Queries/Second ",
        format_rate(metrics.queries_per_second),
    );
    render_counter(frame, app, cols[3], " Error Rate ", format_error_rate(metrics.error_rate));
}

fn render_trend(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    title: &str,
    series: &str,
    points: &[(f64, f64)],
) {
    let live = app.store.history().is_live();
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;
    let y_max = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::max).max(1.0) * 1.2;

    let x_labels: Vec<Span> = if live {
        vec![Span::raw(format!("-{}", points.len().saturating_sub(1))), Span::raw("now")]
    } else {
        vec![
            Span::raw(SAMPLE_LABELS[0]),
            Span::raw(SAMPLE_LABELS[SAMPLE_LABELS.len() / 2]),
            Span::raw(SAMPLE_LABELS[SAMPLE_LABELS.len() - 1]),
        ]
    };

    let color = if series.starts_with("latency") {
        app.theme.series_secondary
    } else {
        app.theme.series_primary
    };
    let dataset = Dataset::default()
        .name(series.to_string())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(points);

    let title = if live {
        title.to_string()
    } else {
        format!("{}(sample) ", title)
    };

    let chart = Chart::new(vec![dataset])
        .block(panel_block(app, &title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(app.theme.border))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(app.theme.border))
                .bounds([0.0, y_max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{:.0}", y_max))]),
        );
    frame.render_widget(chart, area);
}

fn render_workers(frame: &mut Frame, app: &App, area: Rect) {
    let workers: Vec<(&String, &WorkerMetrics)> = app
        .store
        .metrics()
        .map(|m| m.worker_utilization.iter().collect())
        .unwrap_or_default();

    let block = panel_block(app, " Worker Utilization ");
    if workers.is_empty() {
        let paragraph = Paragraph::new("No worker data available")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let detail_height = workers.len() as u16 + 1;
    let [charts, details] =
        Layout::vertical([Constraint::Min(4), Constraint::Length(detail_height)]).areas(inner);
    let [cpu, memory] =
        Layout::horizontal([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)]).areas(charts);

    let cpu_bars: Vec<(String, f64)> =
        workers.iter().map(|(id, w)| (id.to_string(), w.cpu_usage)).collect();
    let memory_bars: Vec<(String, f64)> =
        workers.iter().map(|(id, w)| (id.to_string(), w.memory_usage)).collect();
    render_bars(frame, app, cpu, " CPU Usage ", &cpu_bars, app.theme.series_primary);
    render_bars(frame, app, memory, " Memory Usage ", &memory_bars, app.theme.series_secondary);

    let header = Row::new(vec!["Worker", "CPU", "Memory", "Connections"]).style(app.theme.header);
    let rows = workers.iter().map(|(id, w)| {
        Row::new(vec![
            Cell::from(id.as_str()),
            Cell::from(format!("{:.1}%", w.cpu_usage)),
            Cell::from(format!("{:.1}%", w.memory_usage)),
            Cell::from(w.active_connections.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header);
    frame.render_widget(table, details);
}

/// Percent bars on a fixed 0-100 scale.
fn render_bars(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    title: &str,
    values: &[(String, f64)],
    color: ratatui::style::Color,
) {
    let bars: Vec<Bar> = values
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .label(Line::from(label.as_str()))
                .value(value.clamp(0.0, 100.0).round() as u64)
                .text_value(format!("{:.0}%", value))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel_block(app, title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(8)
        .bar_gap(2)
        .bar_style(Style::default().fg(color))
        .max(100);
    frame.render_widget(chart, area);
}
