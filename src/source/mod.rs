//! Data source abstraction for receiving backend updates.
//!
//! The live channel runs as a background task and pushes [`Update`]s through
//! a channel; the UI loop drains them with [`DataSource::poll`] and applies
//! them to the store. Tests and embedders can feed a [`ChannelSource`]
//! directly without a backend.

mod channel;
pub mod connection;
mod snapshot;
pub mod stomp;

pub use channel::ChannelSource;
pub use connection::ConnectionManager;
pub use snapshot::{
    decode, ComponentStatus, Health, Inbound, PerformanceSnapshot, QueryExecutionEvent,
    SystemStatusSnapshot, Topic, WorkerMetrics,
};
pub(crate) use snapshot::normalize_status;

use std::fmt::{self, Debug};

/// State of the live channel as shown in the header bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    #[default]
    Connecting,
    /// CONNECTED received and all topics subscribed.
    Connected,
    /// The last session ended; a reconnect is scheduled.
    Disconnected { reason: Option<String> },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => f.write_str("Connecting"),
            ConnectionState::Connected => f.write_str("Connected"),
            ConnectionState::Disconnected { .. } => f.write_str("Disconnected"),
        }
    }
}

/// One unit of work for the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Status(SystemStatusSnapshot),
    Metrics(PerformanceSnapshot),
    QueryEvent(QueryExecutionEvent),
    Connection(ConnectionState),
}

impl From<Inbound> for Update {
    fn from(inbound: Inbound) -> Self {
        match inbound {
            Inbound::Status(s) => Update::Status(s),
            Inbound::Metrics(m) => Update::Metrics(m),
            Inbound::QueryEvent(e) => Update::QueryEvent(e),
        }
    }
}

/// Trait for receiving backend updates from various sources.
///
/// # Example
///
/// ```
/// use sqlscope::{ChannelSource, DataSource};
///
/// let (_tx, mut source) = ChannelSource::create("test");
/// assert!(source.poll().is_none());
/// ```
pub trait DataSource: Send + Debug {
    /// Take the next pending update, if any.
    ///
    /// Must not block; the UI loop calls it until it returns `None`.
    fn poll(&mut self) -> Option<Update>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
