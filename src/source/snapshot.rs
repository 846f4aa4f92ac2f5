//! Wire types for backend snapshots.
//!
//! These types match the camelCase JSON emitted by the visualizer backend on
//! its STOMP topics and REST endpoints. Decoding happens here, at the channel
//! edge, so render code only ever sees validated values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

/// Health of a single component as reported by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Health {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

impl Health {
    /// Returns the lowercase label used on the wire and in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Health::Healthy => "healthy",
            Health::Unhealthy => "unhealthy",
            Health::Unknown => "unknown",
        }
    }
}

impl From<String> for Health {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "healthy" => Health::Healthy,
            "unhealthy" => Health::Unhealthy,
            _ => Health::Unknown,
        }
    }
}

impl From<Health> for String {
    fn from(h: Health) -> Self {
        h.label().to_string()
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Latest status of one coordinator or worker node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentStatus {
    pub id: String,
    pub status: Health,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub active_connections: u64,
    pub last_heartbeat: i64,
}

/// Whole-system status pushed on the status topic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStatusSnapshot {
    pub components: BTreeMap<String, ComponentStatus>,
    pub total_queries: u64,
    pub active_queries: u64,
    /// Uptime in seconds.
    pub system_uptime: u64,
    pub last_updated: i64,
}

impl SystemStatusSnapshot {
    /// Look up a component by id.
    pub fn component(&self, id: &str) -> Option<&ComponentStatus> {
        self.components.get(id)
    }

    /// Fill in component ids that the payload left empty from their map keys.
    fn fill_ids(mut self) -> Self {
        for (key, component) in self.components.iter_mut() {
            if component.id.is_empty() {
                component.id = key.clone();
            }
        }
        self
    }
}

/// Utilization of a single worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub active_connections: u64,
}

/// Performance counters pushed on the metrics topic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceSnapshot {
    pub total_queries: u64,
    pub average_latency_ms: f64,
    pub queries_per_second: f64,
    /// Fraction of failed queries, 0.0 to 1.0.
    pub error_rate: f64,
    pub worker_utilization: BTreeMap<String, WorkerMetrics>,
}

/// A progress notification from the query-execution topic.
///
/// `data` is opaque backend JSON and is only displayed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryExecutionEvent {
    pub query_id: String,
    pub status: String,
    pub timestamp: i64,
    pub data: serde_json::Value,
}

/// Envelope shared by the snapshot topics: `{ type, timestamp, data }`.
///
/// Only `data` is read; `type` and `timestamp` are informational.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// The logical topics the client subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    SystemStatus,
    Metrics,
    QueryExecution,
}

/// A decoded message from the live channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Status(SystemStatusSnapshot),
    Metrics(PerformanceSnapshot),
    QueryEvent(QueryExecutionEvent),
}

/// Decode a message body received on `topic`.
///
/// Status and metrics bodies must carry a `data` object; query-execution
/// events are flat objects.
pub fn decode(topic: Topic, body: &str) -> Result<Inbound, PayloadError> {
    match topic {
        Topic::SystemStatus => {
            let envelope: Envelope<SystemStatusSnapshot> = serde_json::from_str(body)?;
            let data = envelope.data.ok_or(PayloadError::MissingData)?;
            Ok(Inbound::Status(data.fill_ids()))
        }
        Topic::Metrics => {
            let envelope: Envelope<PerformanceSnapshot> = serde_json::from_str(body)?;
            let data = envelope.data.ok_or(PayloadError::MissingData)?;
            Ok(Inbound::Metrics(data))
        }
        Topic::QueryExecution => {
            let event: QueryExecutionEvent = serde_json::from_str(body)?;
            Ok(Inbound::QueryEvent(event))
        }
    }
}

/// Normalize a status snapshot that arrived outside an envelope (REST).
pub(crate) fn normalize_status(snapshot: SystemStatusSnapshot) -> SystemStatusSnapshot {
    snapshot.fill_ids()
}
