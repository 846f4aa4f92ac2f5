//! Error types for the live channel, inbound payloads, and query submission.

use thiserror::Error;

/// Errors raised while decoding a payload received on the live channel.
///
/// A payload that fails here is logged and dropped; it never reaches the store.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body was not valid JSON, or did not match the expected shape.
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope had no `data` object.
    #[error("payload has no data object")]
    MissingData,

    /// The frame arrived on a destination we never subscribed to.
    #[error("unexpected destination: {0}")]
    UnknownDestination(String),
}

/// Errors raised by a single session of the live channel.
///
/// Every variant ends the session; the connection manager reconnects
/// after the configured delay.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// TCP or WebSocket handshake failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport failed mid-session.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server did not answer CONNECT with CONNECTED.
    #[error("STOMP handshake failed: {0}")]
    Handshake(String),

    /// The server sent a STOMP ERROR frame.
    #[error("STOMP error: {0}")]
    Stomp(String),

    /// A frame could not be parsed.
    #[error("malformed frame: {0}")]
    Frame(String),

    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => ChannelError::Closed,
            WsError::Io(e) => ChannelError::Transport(e.to_string()),
            other => ChannelError::Transport(other.to_string()),
        }
    }
}

/// Errors returned by REST calls.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request never produced a response (refused, reset, timed out).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Non-success HTTP status without a decodable body.
    #[error("HTTP {0}")]
    Status(u16),
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            QueryError::Decode(err.to_string())
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}
