//! Background work started from the UI: query runs, the scripted demo and
//! REST refresh.
//!
//! Tasks never touch [`App`](crate::app::App). They report through
//! [`TaskEvent`]s tagged with the run generation they were started for, and
//! the UI loop drops events from runs that have since been replaced.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::data::demo::{DemoQuery, DEMO_QUERIES, DEMO_STEPS, QUERY_PAUSE, QUERY_STEP};
use crate::data::pipeline::{PROGRESS_MESSAGES, PROGRESS_STEP};
use crate::error::QueryError;
use crate::query::{BackendApi, QueryResult};
use crate::source::{PerformanceSnapshot, SystemStatusSnapshot};

pub type TaskSender = mpsc::UnboundedSender<TaskEvent>;

/// Progress reported by a background task.
#[derive(Debug)]
pub enum TaskEvent {
    /// `shown` progress messages are now visible.
    QueryProgress { generation: u64, shown: usize },
    /// The REST call has been issued.
    QuerySubmitted { generation: u64 },
    QueryFinished {
        generation: u64,
        result: Result<QueryResult, QueryError>,
    },
    DemoStep { generation: u64, step: usize },
    DemoResult {
        generation: u64,
        query: DemoQuery,
        result: QueryResult,
    },
    DemoQueryFailed {
        generation: u64,
        query: DemoQuery,
        error: QueryError,
    },
    /// The script ran to completion.
    DemoFinished { generation: u64 },
    Refreshed {
        status: Result<SystemStatusSnapshot, QueryError>,
        metrics: Result<PerformanceSnapshot, QueryError>,
    },
}

/// Show the progress messages one by one, then submit `sql`.
///
/// Cancelling during the progress phase abandons the run before anything is
/// sent to the backend.
pub async fn run_query(
    api: Arc<dyn BackendApi>,
    sql: String,
    generation: u64,
    cancel: CancelToken,
    tx: TaskSender,
) {
    for shown in 1..=PROGRESS_MESSAGES.len() {
        let _ = tx.send(TaskEvent::QueryProgress { generation, shown });
        if !cancel.sleep(PROGRESS_STEP).await {
            debug!("Query run {} cancelled", generation);
            return;
        }
    }

    let _ = tx.send(TaskEvent::QuerySubmitted { generation });
    let result = api.execute(&sql).await;
    if let Err(ref e) = result {
        warn!("Query failed: {}", e);
    }
    let _ = tx.send(TaskEvent::QueryFinished { generation, result });
}

/// Walk through [`DEMO_STEPS`], running the canned queries at
/// [`QUERY_STEP`].
///
/// Every wait observes `cancel`. A query already sent is allowed to finish
/// and its result is still reported, but no further query starts after
/// cancellation.
pub async fn run_demo(
    api: Arc<dyn BackendApi>,
    generation: u64,
    cancel: CancelToken,
    tx: TaskSender,
) {
    for (step, script) in DEMO_STEPS.iter().enumerate() {
        if cancel.is_cancelled() {
            return;
        }
        let _ = tx.send(TaskEvent::DemoStep { generation, step });

        if step == QUERY_STEP {
            for query in DEMO_QUERIES {
                if cancel.is_cancelled() {
                    return;
                }
                match api.execute(query.sql).await {
                    Ok(result) => {
                        let _ = tx.send(TaskEvent::DemoResult { generation, query, result });
                    }
                    Err(error) => {
                        warn!("Demo query failed: {}", error);
                        let _ = tx.send(TaskEvent::DemoQueryFailed { generation, query, error });
                    }
                }
                if !cancel.sleep(QUERY_PAUSE).await {
                    return;
                }
            }
        }

        if !cancel.sleep(script.duration).await {
            debug!("Demo run {} stopped at step {}", generation, step);
            return;
        }
    }
    let _ = tx.send(TaskEvent::DemoFinished { generation });
}

/// Fetch status and metrics once.
pub async fn refresh(api: Arc<dyn BackendApi>, tx: TaskSender) {
    let (status, metrics) = tokio::join!(api.fetch_status(), api.fetch_metrics());
    let _ = tx.send(TaskEvent::Refreshed { status, metrics });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fake::FakeBackend;
    use std::time::Duration;

    fn drain(rx: &mut mpsc::UnboundedReceiver<TaskEvent>) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_run_reports_progress_then_result() {
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sql = "SELECT COUNT(*) FROM users".to_string();
        run_query(backend.clone(), sql, 3, CancelToken::new(), tx).await;

        let events = drain(&mut rx);
        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                TaskEvent::QueryProgress { generation: 3, shown } => Some(*shown),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3, 4, 5, 6]);
        assert!(matches!(
            events.last(),
            Some(TaskEvent::QueryFinished { generation: 3, result: Ok(_) })
        ));
        assert_eq!(*backend.queries.lock().unwrap(), vec!["SELECT COUNT(*) FROM users"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_progress_takes_half_second_per_message() {
        let backend = FakeBackend::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let start = tokio::time::Instant::now();

        run_query(backend, "SELECT 1".to_string(), 0, CancelToken::new(), tx).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_query_is_never_sent() {
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        cancel.cancel();

        run_query(backend.clone(), "SELECT 1".to_string(), 0, cancel, tx).await;

        assert_eq!(backend.call_count(), 0);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_runs_script() {
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = tokio::time::Instant::now();

        run_demo(backend.clone(), 1, CancelToken::new(), tx).await;

        // 15s of steps plus a 1s pause after each of the three queries
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(18));
        assert!(elapsed < Duration::from_millis(18_100));
        assert_eq!(backend.call_count(), 3);

        let events = drain(&mut rx);
        let steps: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                TaskEvent::DemoStep { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![0, 1, 2, 3]);
        let results = events
            .iter()
            .filter(|e| matches!(e, TaskEvent::DemoResult { .. }))
            .count();
        assert_eq!(results, 3);
        assert!(matches!(events.last(), Some(TaskEvent::DemoFinished { generation: 1 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_stopped_immediately_issues_no_query() {
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();

        let handle = tokio::spawn(run_demo(backend.clone(), 1, cancel.clone(), tx));
        cancel.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.call_count(), 0);
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, TaskEvent::DemoFinished { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_stop_during_queries_lets_inflight_finish() {
        let backend = FakeBackend::with_latency(Duration::from_millis(200));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let handle = tokio::spawn(run_demo(backend.clone(), 1, cancel.clone(), tx));

        // Step 0 lasts 3s; the first query is in flight at 3.1s
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(backend.call_count(), 1);
        cancel.cancel();
        handle.await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(backend.call_count(), 1);
        assert!(events.iter().any(|e| matches!(e, TaskEvent::DemoResult { .. })));
        assert!(!events.iter().any(|e| matches!(e, TaskEvent::DemoFinished { .. })));
    }

    #[tokio::test]
    async fn test_refresh_fetches_both() {
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        refresh(backend.clone(), tx).await;

        assert_eq!(backend.call_count(), 2);
        match rx.try_recv().unwrap() {
            TaskEvent::Refreshed { status, metrics } => {
                assert_eq!(status.unwrap().total_queries, 11);
                assert_eq!(metrics.unwrap().queries_per_second, 3.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
