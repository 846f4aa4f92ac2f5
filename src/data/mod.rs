//! State models behind the panels.
//!
//! ## Submodules
//!
//! - [`store`]: Latest-wins [`SnapshotStore`] fed by the live channel and REST refresh
//! - [`history`]: Rolling throughput and latency samples for the performance charts
//! - [`pipeline`]: The five query pipeline stages and their derived statuses
//! - [`demo`]: The scripted demo steps, canned queries and [`DemoState`]
//!
//! ## Data Flow
//!
//! ```text
//! Update (from the live channel or a refresh)
//!        │
//!        ▼
//! SnapshotStore::apply()
//!        │
//!        ├──▶ status / metrics / query event slots (whole replacement)
//!        │
//!        └──▶ History::record() (metrics only)
//! ```

pub mod demo;
pub mod history;
pub mod pipeline;
pub mod store;

pub use demo::{DemoQuery, DemoState, DemoStep, DEMO_QUERIES, DEMO_STEPS};
pub use history::History;
pub use pipeline::{ExecutionPhase, Stage, StepStatus, SAMPLE_QUERIES};
pub use store::SnapshotStore;
