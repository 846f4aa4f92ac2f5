//! # sqlscope
//!
//! A terminal visualizer for a distributed SQL query engine.
//!
//! sqlscope subscribes to the engine's live STOMP channel for system status,
//! performance metrics and query execution events, and submits queries over
//! its REST API. It renders the cluster topology, the query pipeline,
//! performance trends and a guided demo in an interactive terminal UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │ (store)  │    │(render) │    │         │ │
//! │  └──┬───┬──┘    └──────────┘    └─────────┘    └─────────┘ │
//! │     │   │                                                   │
//! │     │   ▼                                                   │
//! │     │ ┌─────────┐     ┌───────────────────┐                 │
//! │     │ │ source  │◀────│ ConnectionManager │◀── STOMP / WS   │
//! │     │ │ (input) │     └───────────────────┘                 │
//! │     │ └─────────┘                                           │
//! │     ▼                                                       │
//! │  ┌─────────┐     ┌─────────────┐                            │
//! │  │ tasks   │────▶│ QueryClient │────▶ REST                  │
//! │  └─────────┘     └─────────────┘                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, view navigation, query and demo runs
//! - **[`source`]**: The live channel: STOMP framing, topic decoding, the
//!   reconnecting [`ConnectionManager`] and the [`DataSource`] trait
//! - **[`data`]**: The latest-wins [`SnapshotStore`], metric history, the
//!   query pipeline model and the demo script
//! - **[`query`]**: REST client behind the [`BackendApi`] trait
//! - **[`tasks`]**: Background query, demo and refresh runs
//! - **[`ui`]**: Terminal rendering using ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Connect to an engine on localhost:8080
//! sqlscope
//!
//! # Another host, starting on the performance view
//! sqlscope --host engine.local --port 9090 --view performance
//! ```
//!
//! ### Feeding the store without a backend
//!
//! ```
//! use sqlscope::{ChannelSource, DataSource, SnapshotStore, Update, ConnectionState};
//!
//! let (tx, mut source) = ChannelSource::create("embedded");
//! tx.try_send(Update::Connection(ConnectionState::Connected)).unwrap();
//!
//! let mut store = SnapshotStore::new();
//! while let Some(update) = source.poll() {
//!     store.apply(update);
//! }
//! assert!(store.connection().is_connected());
//! ```

pub mod app;
pub mod cancel;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod query;
pub mod source;
pub mod tasks;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, View};
pub use cancel::CancelToken;
pub use config::{Overrides, Settings, ThemeChoice};
pub use data::{History, SnapshotStore};
pub use error::{ChannelError, PayloadError, QueryError};
pub use query::{BackendApi, QueryClient, QueryResult};
pub use source::{
    ChannelSource, ComponentStatus, ConnectionManager, ConnectionState, DataSource, Health,
    PerformanceSnapshot, QueryExecutionEvent, SystemStatusSnapshot, Update,
};
