//! Application state and navigation logic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::data::{DemoQuery, DemoState, ExecutionPhase, SnapshotStore, SAMPLE_QUERIES};
use crate::query::{BackendApi, QueryResult};
use crate::source::{DataSource, Update};
use crate::tasks::{self, TaskEvent, TaskSender};
use crate::ui::Theme;

/// How long a status bar message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Coordinator and worker topology with component cards.
    #[default]
    Architecture,
    /// Query pipeline and interactive query runner.
    QueryFlow,
    /// Counters, trend charts and worker utilization.
    Performance,
    /// Scripted walkthrough.
    Demo,
}

impl View {
    pub const ALL: [View; 4] = [View::Architecture, View::QueryFlow, View::Performance, View::Demo];

    /// Parse a view id; unknown ids fall back to [`View::Architecture`].
    pub fn from_id(id: &str) -> Self {
        match id {
            "query-flow" => View::QueryFlow,
            "performance" => View::Performance,
            "demo" => View::Demo,
            _ => View::Architecture,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            View::Architecture => "architecture",
            View::QueryFlow => "query-flow",
            View::Performance => "performance",
            View::Demo => "demo",
        }
    }

    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Architecture => View::QueryFlow,
            View::QueryFlow => View::Performance,
            View::Performance => View::Demo,
            View::Demo => View::Architecture,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Architecture => View::Demo,
            View::QueryFlow => View::Architecture,
            View::Performance => View::QueryFlow,
            View::Demo => View::Performance,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Architecture => "Architecture",
            View::QueryFlow => "Query Flow",
            View::Performance => "Performance",
            View::Demo => "Demo",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            View::Architecture => 0,
            View::QueryFlow => 1,
            View::Performance => 2,
            View::Demo => 3,
        }
    }
}

/// State of the Query Flow runner.
#[derive(Debug, Default)]
pub struct QueryPanel {
    pub input: String,
    /// Keystrokes go to `input` while set.
    pub editing: bool,
    pub phase: ExecutionPhase,
    pub result: Option<QueryResult>,
    pub error: Option<String>,
    /// Index of the sample last loaded into `input`.
    pub sample: usize,
    generation: u64,
    cancel: CancelToken,
}

/// State of the scripted demo.
#[derive(Debug, Default)]
pub struct DemoPanel {
    pub state: DemoState,
    pub results: Vec<(DemoQuery, QueryResult)>,
    generation: u64,
    cancel: CancelToken,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    // Data source
    source: Box<dyn DataSource>,
    pub store: SnapshotStore,

    // Backend calls and the tasks running them
    api: Arc<dyn BackendApi>,
    task_tx: TaskSender,
    task_rx: mpsc::UnboundedReceiver<TaskEvent>,

    pub query: QueryPanel,
    pub demo: DemoPanel,

    // UI
    pub theme: Theme,
    /// Animation frame counter, advanced on every tick.
    pub frame_count: u64,
    dirty: bool,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading from `source` and calling `api` for
    /// requests.
    pub fn new(source: Box<dyn DataSource>, api: Arc<dyn BackendApi>, theme: Theme) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let query = QueryPanel {
            input: SAMPLE_QUERIES[0].to_string(),
            ..QueryPanel::default()
        };
        Self {
            running: true,
            current_view: View::default(),
            show_help: false,
            source,
            store: SnapshotStore::new(),
            api,
            task_tx,
            task_rx,
            query,
            demo: DemoPanel::default(),
            theme,
            frame_count: 0,
            dirty: true,
            status_message: None,
        }
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
        self.dirty = true;
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a redraw is needed; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Whether something on screen animates.
    pub fn is_animating(&self) -> bool {
        self.demo.state.is_running() || self.query.phase.is_running()
    }

    /// Advance the animation frame.
    pub fn on_tick(&mut self) {
        if self.is_animating() {
            self.frame_count = self.frame_count.wrapping_add(1);
            self.dirty = true;
        }
        // Let an expired status message disappear
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() >= STATUS_MESSAGE_TTL {
                self.status_message = None;
                self.dirty = true;
            }
        }
    }

    /// Apply every pending update from the data source.
    ///
    /// Returns true if anything was applied.
    pub fn drain_updates(&mut self) -> bool {
        let mut changed = false;
        while let Some(update) = self.source.poll() {
            self.store.apply(update);
            changed = true;
        }
        self.dirty |= changed;
        changed
    }

    /// Apply every pending background task event.
    pub fn drain_tasks(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.task_rx.try_recv() {
            self.handle_task_event(event);
            changed = true;
        }
        changed
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.set_view(self.current_view.next());
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.set_view(self.current_view.prev());
    }

    /// Switch to a specific view. Purely local; nothing is fetched.
    pub fn set_view(&mut self, view: View) {
        if self.current_view != view {
            self.current_view = view;
            self.query.editing = false;
        }
        self.dirty = true;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        self.dirty = true;
    }

    /// Signal the application to quit and stop background runs.
    pub fn quit(&mut self) {
        self.query.cancel.cancel();
        self.demo.cancel.cancel();
        self.running = false;
    }

    // Query Flow

    pub fn start_editing(&mut self) {
        self.query.editing = true;
        self.dirty = true;
    }

    pub fn stop_editing(&mut self) {
        self.query.editing = false;
        self.dirty = true;
    }

    pub fn input_push(&mut self, c: char) {
        self.query.input.push(c);
        self.dirty = true;
    }

    pub fn input_pop(&mut self) {
        self.query.input.pop();
        self.dirty = true;
    }

    /// Load the next sample query into the input.
    pub fn next_sample(&mut self) {
        if self.query.input == SAMPLE_QUERIES[self.query.sample] {
            self.query.sample = (self.query.sample + 1) % SAMPLE_QUERIES.len();
        }
        self.query.input = SAMPLE_QUERIES[self.query.sample].to_string();
        self.dirty = true;
    }

    /// Clear the input and any result, abandoning a run in progress.
    pub fn clear_query(&mut self) {
        self.query.cancel.cancel();
        self.query.generation += 1;
        self.query.input.clear();
        self.query.phase = ExecutionPhase::Idle;
        self.query.result = None;
        self.query.error = None;
        self.dirty = true;
    }

    /// Start running the input query. Ignored while a run is in progress or
    /// when the input is blank.
    pub fn execute_query(&mut self) {
        if self.query.phase.is_running() {
            return;
        }
        let sql = self.query.input.trim().to_string();
        if sql.is_empty() {
            self.set_status_message("Enter a query first".to_string());
            return;
        }

        self.query.generation += 1;
        self.query.cancel = CancelToken::new();
        self.query.phase = ExecutionPhase::Progress(0);
        self.query.result = None;
        self.query.error = None;
        self.query.editing = false;
        self.dirty = true;

        info!("Executing query: {}", sql);
        tokio::spawn(tasks::run_query(
            self.api.clone(),
            sql,
            self.query.generation,
            self.query.cancel.clone(),
            self.task_tx.clone(),
        ));
    }

    // Demo

    /// Start the scripted demo unless it is already running.
    pub fn start_demo(&mut self) {
        if self.demo.state.is_running() {
            return;
        }
        self.demo.generation += 1;
        self.demo.cancel = CancelToken::new();
        self.demo.state = DemoState::Running(0);
        self.demo.results.clear();
        self.dirty = true;

        info!("Starting demo run {}", self.demo.generation);
        tokio::spawn(tasks::run_demo(
            self.api.clone(),
            self.demo.generation,
            self.demo.cancel.clone(),
            self.task_tx.clone(),
        ));
    }

    /// Stop the demo and return to the first step.
    pub fn stop_demo(&mut self) {
        if self.demo.state.is_running() {
            info!("Stopping demo run {}", self.demo.generation);
        }
        self.demo.cancel.cancel();
        self.demo.state = DemoState::Idle;
        self.dirty = true;
    }

    /// Fetch status and metrics over REST.
    pub fn refresh(&mut self) {
        self.set_status_message("Refreshing...".to_string());
        tokio::spawn(tasks::refresh(self.api.clone(), self.task_tx.clone()));
    }

    /// Apply one background task event.
    ///
    /// Events tagged with a generation other than the current run's are
    /// dropped.
    pub fn handle_task_event(&mut self, event: TaskEvent) {
        self.dirty = true;
        match event {
            TaskEvent::QueryProgress { generation, shown }
                if generation == self.query.generation =>
            {
                self.query.phase = ExecutionPhase::Progress(shown);
            }
            TaskEvent::QuerySubmitted { generation } if generation == self.query.generation => {
                self.query.phase = ExecutionPhase::Submitted;
            }
            TaskEvent::QueryFinished { generation, result }
                if generation == self.query.generation =>
            {
                match result {
                    Ok(result) => {
                        self.query.result = Some(result);
                        self.query.phase = ExecutionPhase::Succeeded;
                    }
                    Err(e) => {
                        let stage = self.query.phase.running_stage().unwrap_or(0);
                        self.query.error = Some(e.to_string());
                        self.query.phase = ExecutionPhase::Failed { stage };
                    }
                }
            }
            TaskEvent::DemoStep { generation, step } if generation == self.demo.generation => {
                // A step reported after stop must not restart the demo
                if self.demo.state.is_running() {
                    self.demo.state = DemoState::Running(step);
                }
            }
            TaskEvent::DemoResult {
                generation,
                query,
                result,
            } if generation == self.demo.generation => {
                self.demo.results.push((query, result));
            }
            TaskEvent::DemoQueryFailed {
                generation,
                query,
                error,
            } if generation == self.demo.generation => {
                self.set_status_message(format!("Demo query failed: {} ({})", error, query.sql));
            }
            TaskEvent::DemoFinished { generation } if generation == self.demo.generation => {
                info!("Demo run {} finished", generation);
                self.demo.state = DemoState::Idle;
            }
            TaskEvent::Refreshed { status, metrics } => {
                let mut failures = Vec::new();
                match status {
                    Ok(status) => self.store.apply(Update::Status(status)),
                    Err(e) => failures.push(format!("status: {}", e)),
                }
                match metrics {
                    Ok(metrics) => self.store.apply(Update::Metrics(metrics)),
                    Err(e) => failures.push(format!("metrics: {}", e)),
                }
                if failures.is_empty() {
                    self.set_status_message("Refreshed status and metrics".to_string());
                } else {
                    warn!("Refresh failed: {}", failures.join(", "));
                    self.set_status_message(format!("Refresh failed: {}", failures.join(", ")));
                }
            }
            stale => {
                tracing::debug!("Dropping stale task event {:?}", stale);
            }
        }
    }

    /// Export current state to a file.
    pub fn export_state(&self, path: &std::path::Path) -> anyhow::Result<()> {
        use std::io::Write;

        if self.store.status().is_none() && self.store.metrics().is_none() {
            anyhow::bail!("No data to export");
        }

        let mut export = serde_json::to_value(self.store.export())?;
        if let Some(object) = export.as_object_mut() {
            object.insert(
                "lastQueryResult".to_string(),
                serde_json::to_value(&self.query.result)?,
            );
            object.insert("view".to_string(), serde_json::json!(self.current_view.id()));
        }

        let json = serde_json::to_string_pretty(&export)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fake::FakeBackend;
    use crate::source::{ChannelSource, SystemStatusSnapshot};

    fn test_app(backend: Arc<FakeBackend>) -> (mpsc::Sender<Update>, App) {
        let (tx, source) = ChannelSource::create("test");
        (tx, App::new(Box::new(source), backend, Theme::dark()))
    }

    /// Let paused time run until the current query run is over.
    async fn settle_query(app: &mut App) {
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            app.drain_tasks();
            if !app.query.phase.is_running() {
                return;
            }
        }
        panic!("query did not finish");
    }

    #[test]
    fn test_view_from_id() {
        assert_eq!(View::from_id("query-flow"), View::QueryFlow);
        assert_eq!(View::from_id("performance"), View::Performance);
        assert_eq!(View::from_id("demo"), View::Demo);
        assert_eq!(View::from_id("architecture"), View::Architecture);
        assert_eq!(View::from_id("nonsense"), View::Architecture);
        assert_eq!(View::from_id(""), View::Architecture);
        for view in View::ALL {
            assert_eq!(View::from_id(view.id()), view);
        }
    }

    #[test]
    fn test_view_cycle() {
        let mut view = View::Architecture;
        for _ in 0..View::ALL.len() {
            view = view.next();
        }
        assert_eq!(view, View::Architecture);
        assert_eq!(View::Architecture.prev(), View::Demo);
    }

    #[test]
    fn test_view_switching_never_calls_backend() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());

        for view in View::ALL {
            app.set_view(view);
            assert!(app.take_dirty());
        }
        app.next_view();
        app.prev_view();

        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_drain_updates_applies_to_store() {
        let (tx, mut app) = test_app(FakeBackend::new());
        app.take_dirty();
        assert!(!app.drain_updates());

        let status = SystemStatusSnapshot {
            total_queries: 4,
            ..SystemStatusSnapshot::default()
        };
        tx.try_send(Update::Status(status)).unwrap();

        assert!(app.drain_updates());
        assert!(app.take_dirty());
        assert_eq!(app.store.status().unwrap().total_queries, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_query_shows_result() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());
        app.query.input = "SELECT COUNT(*) FROM users".to_string();

        app.execute_query();
        assert!(app.query.phase.is_running());
        // A second execute while running is ignored
        app.execute_query();

        settle_query(&mut app).await;

        assert_eq!(*backend.queries.lock().unwrap(), vec!["SELECT COUNT(*) FROM users"]);
        assert_eq!(app.query.phase, ExecutionPhase::Succeeded);
        let result = app.query.result.as_ref().unwrap();
        assert_eq!(result.rows_returned, 1);
        assert_eq!(result.results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_is_not_submitted() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());
        app.query.input = "   ".to_string();

        app.execute_query();
        tokio::time::sleep(Duration::from_secs(5)).await;
        app.drain_tasks();

        assert_eq!(app.query.phase, ExecutionPhase::Idle);
        assert_eq!(backend.call_count(), 0);
        assert!(app.get_status_message().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_error_inline_and_retry() {
        let backend = FakeBackend::rejecting("Query execution failed");
        let (_tx, mut app) = test_app(backend.clone());

        app.execute_query();
        settle_query(&mut app).await;

        assert_eq!(app.query.error.as_deref(), Some("Query execution failed"));
        assert!(matches!(app.query.phase, ExecutionPhase::Failed { .. }));
        assert!(app.query.result.is_none());

        app.execute_query();
        assert!(app.query.error.is_none());
        settle_query(&mut app).await;
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_abandons_running_query() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());

        app.execute_query();
        tokio::time::sleep(Duration::from_millis(700)).await;
        app.clear_query();
        tokio::time::sleep(Duration::from_secs(5)).await;
        app.drain_tasks();

        assert_eq!(app.query.phase, ExecutionPhase::Idle);
        assert!(app.query.input.is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_next_sample_cycles() {
        let (_tx, mut app) = test_app(FakeBackend::new());
        assert_eq!(app.query.input, SAMPLE_QUERIES[0]);

        app.next_sample();
        assert_eq!(app.query.input, SAMPLE_QUERIES[1]);

        // After editing, the first press restores the current sample
        app.input_push(' ');
        app.next_sample();
        assert_eq!(app.query.input, SAMPLE_QUERIES[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_start_then_stop_is_idle() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());

        app.start_demo();
        assert!(app.demo.state.is_running());
        app.stop_demo();
        assert_eq!(app.demo.state, DemoState::Idle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        app.drain_tasks();

        assert_eq!(app.demo.state, DemoState::Idle);
        assert_eq!(backend.call_count(), 0);
        assert!(app.demo.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_runs_to_completion() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());

        app.start_demo();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        app.drain_tasks();
        assert_eq!(app.demo.state, DemoState::Running(1));

        tokio::time::sleep(Duration::from_secs(20)).await;
        app.drain_tasks();

        assert_eq!(app.demo.state, DemoState::Idle);
        assert_eq!(app.demo.results.len(), 3);
        assert_eq!(app.demo.results[1].0.sql, "SELECT COUNT(*) FROM users");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_demo_events_are_dropped() {
        let (_tx, mut app) = test_app(FakeBackend::new());
        app.start_demo();
        app.stop_demo();
        app.start_demo();

        app.handle_task_event(TaskEvent::DemoResult {
            generation: 1,
            query: crate::data::DEMO_QUERIES[0],
            result: QueryResult::default(),
        });
        app.handle_task_event(TaskEvent::DemoFinished { generation: 1 });

        assert!(app.demo.results.is_empty());
        assert!(app.demo.state.is_running());
        app.stop_demo();
    }

    #[tokio::test]
    async fn test_refresh_seeds_store() {
        let backend = FakeBackend::new();
        let (_tx, mut app) = test_app(backend.clone());

        app.refresh();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if app.drain_tasks() {
                break;
            }
        }

        assert_eq!(app.store.status().unwrap().total_queries, 11);
        assert_eq!(app.store.metrics().unwrap().queries_per_second, 3.0);
    }

    #[test]
    fn test_export_state() {
        let (tx, mut app) = test_app(FakeBackend::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        assert!(app.export_state(&path).is_err());

        tx.try_send(Update::Status(SystemStatusSnapshot {
            total_queries: 3,
            ..SystemStatusSnapshot::default()
        }))
        .unwrap();
        app.drain_updates();
        app.export_state(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["status"]["totalQueries"], 3);
        assert_eq!(written["view"], "architecture");
        assert!(written["lastQueryResult"].is_null());
    }
}
