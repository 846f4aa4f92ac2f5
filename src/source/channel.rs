//! Channel-based data source.
//!
//! Receives updates via a tokio mpsc channel. The connection manager holds
//! the sending half; the UI loop holds this source.

use tokio::sync::mpsc;

use super::{DataSource, Update};

/// Capacity of the update channel between the socket task and the UI.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// A data source that receives updates via a channel.
///
/// Updates from one sender arrive in the order they were sent, which keeps
/// per-topic ordering intact.
///
/// # Example
///
/// ```
/// use sqlscope::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("ws://localhost:8080/ws/websocket");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Update>,
    description: String,
}

impl ChannelSource {
    /// Create a new channel source from an existing receiver.
    pub fn new(receiver: mpsc::Receiver<Update>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("live: {}", source_description),
        }
    }

    /// Create a channel pair for sending updates to a ChannelSource.
    pub fn create(source_description: &str) -> (mpsc::Sender<Update>, Self) {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        (tx, Self::new(rx, source_description))
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<Update> {
        // Disconnected only happens once every sender is gone, which the
        // header already reports through the last Connection update.
        self.receiver.try_recv().ok()
    }

    fn description(&self) -> &str {
        &self.description
    }
}
