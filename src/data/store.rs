//! Latest-wins store for everything received from the backend.

use std::time::Instant;

use serde::Serialize;

use super::History;
use crate::error::PayloadError;
use crate::source::{
    decode, normalize_status, ConnectionState, PerformanceSnapshot, QueryExecutionEvent,
    SystemStatusSnapshot, Topic, Update,
};

/// Holds the most recent status and metrics snapshots.
///
/// Every update replaces the previous value of its slot as a whole; nothing
/// is merged. Panels read through the accessors and never mutate.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    status: Option<SystemStatusSnapshot>,
    metrics: Option<PerformanceSnapshot>,
    last_query_event: Option<QueryExecutionEvent>,
    connection: ConnectionState,
    history: History,
    revision: u64,
    last_updated: Option<Instant>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update, replacing the matching slot.
    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Status(status) => {
                self.status = Some(normalize_status(status));
                self.touch();
            }
            Update::Metrics(metrics) => {
                self.history.record(&metrics);
                self.metrics = Some(metrics);
                self.touch();
            }
            Update::QueryEvent(event) => {
                self.last_query_event = Some(event);
                self.touch();
            }
            Update::Connection(state) => {
                self.connection = state;
                self.revision += 1;
            }
        }
    }

    /// Decode a raw message body and apply it.
    ///
    /// On a decode error the store is left exactly as it was.
    pub fn ingest(&mut self, topic: Topic, body: &str) -> Result<(), PayloadError> {
        let inbound = decode(topic, body)?;
        self.apply(inbound.into());
        Ok(())
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.last_updated = Some(Instant::now());
    }

    pub fn status(&self) -> Option<&SystemStatusSnapshot> {
        self.status.as_ref()
    }

    pub fn metrics(&self) -> Option<&PerformanceSnapshot> {
        self.metrics.as_ref()
    }

    pub fn last_query_event(&self) -> Option<&QueryExecutionEvent> {
        self.last_query_event.as_ref()
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Incremented on every applied update.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// When the last data update (not connection change) arrived.
    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    /// Serializable view of the store for export.
    pub fn export(&self) -> StoreExport<'_> {
        StoreExport {
            connection: self.connection.to_string(),
            status: self.status.as_ref(),
            metrics: self.metrics.as_ref(),
            last_query_event: self.last_query_event.as_ref(),
        }
    }
}

/// Borrowed snapshot of the store as written by the export command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreExport<'a> {
    pub connection: String,
    pub status: Option<&'a SystemStatusSnapshot>,
    pub metrics: Option<&'a PerformanceSnapshot>,
    pub last_query_event: Option<&'a QueryExecutionEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_body(total: u64, worker_health: &str) -> String {
        format!(
            r#"{{"type":"system_status","data":{{"totalQueries":{},
                "components":{{"worker1":{{"status":"{}","cpuUsage":10.0}}}}}}}}"#,
            total, worker_health
        )
    }

    #[test]
    fn test_latest_status_wins() {
        let mut store = SnapshotStore::new();
        store.ingest(Topic::SystemStatus, &status_body(1, "healthy")).unwrap();
        store.ingest(Topic::SystemStatus, &status_body(2, "unhealthy")).unwrap();
        store.ingest(Topic::SystemStatus, &status_body(3, "healthy")).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.total_queries, 3);
        assert_eq!(status.components.len(), 1);
        assert_eq!(status.component("worker1").unwrap().id, "worker1");
    }

    #[test]
    fn test_replacement_drops_absent_components() {
        let mut store = SnapshotStore::new();
        let body = r#"{"data":{"components":{"coordinator":{"status":"healthy"},
            "worker2":{"status":"healthy"}}}}"#;
        store.ingest(Topic::SystemStatus, body).unwrap();
        store.ingest(Topic::SystemStatus, &status_body(5, "healthy")).unwrap();

        let status = store.status().unwrap();
        assert!(status.component("coordinator").is_none());
        assert!(status.component("worker2").is_none());
    }

    #[test]
    fn test_malformed_message_leaves_store_unchanged() {
        let mut store = SnapshotStore::new();
        store.ingest(Topic::SystemStatus, &status_body(7, "healthy")).unwrap();
        let before = store.status().cloned();
        let revision = store.revision();

        assert!(store.ingest(Topic::SystemStatus, "{not json").is_err());
        assert!(store.ingest(Topic::SystemStatus, r#"{"type":"system_status"}"#).is_err());
        assert!(store
            .ingest(Topic::SystemStatus, r#"{"data":{"totalQueries":"many"}}"#)
            .is_err());

        assert_eq!(store.status().cloned(), before);
        assert_eq!(store.revision(), revision);

        // Still accepts valid messages afterwards
        store.ingest(Topic::SystemStatus, &status_body(8, "healthy")).unwrap();
        assert_eq!(store.status().unwrap().total_queries, 8);
    }

    #[test]
    fn test_metrics_feed_history() {
        let mut store = SnapshotStore::new();
        let body = r#"{"data":{"queriesPerSecond":4.5,"averageLatencyMs":80.0}}"#;
        store.ingest(Topic::Metrics, body).unwrap();
        store.ingest(Topic::Metrics, body).unwrap();

        assert_eq!(store.metrics().unwrap().queries_per_second, 4.5);
        assert!(store.history().is_live());
        assert!(store.last_updated().is_some());
    }

    #[test]
    fn test_connection_and_query_event() {
        let mut store = SnapshotStore::new();
        assert_eq!(store.connection(), &ConnectionState::Connecting);

        store.apply(Update::Connection(ConnectionState::Connected));
        store
            .ingest(
                Topic::QueryExecution,
                r#"{"type":"query_execution","queryId":"q-1","status":"completed","timestamp":1}"#,
            )
            .unwrap();

        assert!(store.connection().is_connected());
        assert_eq!(store.last_query_event().unwrap().query_id, "q-1");
        assert_eq!(store.export().connection, "Connected");
    }
}
