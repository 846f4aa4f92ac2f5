//! Live channel to the backend: STOMP over WebSocket with fixed-delay
//! reconnection.
//!
//! ```text
//! connect ──▶ CONNECT/CONNECTED ──▶ SUBSCRIBE × topics ──▶ MESSAGE loop
//!    ▲                                                          │
//!    └──────────── sleep(reconnect_delay) ◀── close / error ────┘
//! ```
//!
//! Each session either ends with an error (and a reconnect is scheduled) or
//! with shutdown. Malformed payloads are logged and dropped without ending
//! the session.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::stomp::{parse_frames, Frame};
use super::{decode, ConnectionState, Topic, Update};
use crate::cancel::CancelToken;
use crate::config::{BackendSettings, ChannelSettings};
use crate::error::{ChannelError, PayloadError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Owns the socket task's configuration and the sending half of the
/// update channel.
#[derive(Debug)]
pub struct ConnectionManager {
    url: String,
    host: String,
    channel: ChannelSettings,
    routes: Vec<(Topic, String)>,
    tx: mpsc::Sender<Update>,
    shutdown: CancelToken,
}

impl ConnectionManager {
    pub fn new(
        backend: &BackendSettings,
        channel: &ChannelSettings,
        tx: mpsc::Sender<Update>,
        shutdown: CancelToken,
    ) -> Self {
        let topics = &channel.topics;
        let routes = vec![
            (Topic::SystemStatus, topics.status.clone()),
            (Topic::Metrics, topics.metrics.clone()),
            (Topic::QueryExecution, topics.query_execution.clone()),
        ];
        Self {
            url: backend.ws_url(),
            host: backend.authority(),
            channel: channel.clone(),
            routes,
            tx,
            shutdown,
        }
    }

    /// Run the manager on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Connect, stream, and reconnect until shutdown or until the receiving
    /// side of the update channel is dropped.
    pub async fn run(self) {
        let delay = self.channel.reconnect_delay();

        loop {
            if self.shutdown.is_cancelled() || self.tx.is_closed() {
                break;
            }

            self.publish(ConnectionState::Connecting).await;

            match self.session().await {
                Ok(()) => break,
                Err(e) => {
                    warn!("Live channel to {} ended: {}", self.url, e);
                    self.publish(ConnectionState::Disconnected {
                        reason: Some(e.to_string()),
                    })
                    .await;
                }
            }

            debug!("Reconnecting in {:?}", delay);
            if !self.shutdown.sleep(delay).await {
                break;
            }
        }

        info!("Live channel stopped");
        let _ = self
            .tx
            .try_send(Update::Connection(ConnectionState::Disconnected { reason: None }));
    }

    async fn publish(&self, state: ConnectionState) {
        let _ = self.tx.send(Update::Connection(state)).await;
    }

    /// One connection from open to close. `Ok` means shutdown was requested.
    async fn session(&self) -> Result<(), ChannelError> {
        let (mut sink, mut stream) = tokio::select! {
            _ = self.shutdown.cancelled() => return Ok(()),
            opened = self.open() => opened?,
        };

        self.publish(ConnectionState::Connected).await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Shutdown requested, sending DISCONNECT");
                    let _ = sink.send(Message::Text(Frame::disconnect().encode())).await;
                    let _ = sink.close().await;
                    return Ok(());
                }
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text).await?,
                    Some(Ok(Message::Ping(data))) => sink.send(Message::Pong(data)).await?,
                    Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }

    /// Open the socket, complete the STOMP handshake and subscribe.
    async fn open(&self) -> Result<(WsSink, WsSource), ChannelError> {
        debug!("Connecting to {}", self.url);
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        sink.send(Message::Text(Frame::connect(&self.host).encode())).await?;
        let limit = self.channel.handshake_timeout();
        tokio::time::timeout(limit, await_connected(&mut stream))
            .await
            .map_err(|_| ChannelError::Handshake(format!("timed out after {:?}", limit)))??;
        info!("Connected to {}", self.url);

        for (i, (_, destination)) in self.routes.iter().enumerate() {
            let id = format!("sub-{}", i);
            sink.send(Message::Text(Frame::subscribe(&id, destination).encode())).await?;
            info!("Subscribed to {}", destination);
        }

        Ok((sink, stream))
    }

    /// Route every frame in a text message.
    ///
    /// Returns an error only for conditions that end the session.
    async fn handle_text(&self, text: &str) -> Result<(), ChannelError> {
        let frames = match parse_frames(text) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Dropping unparseable frame: {}", e);
                return Ok(());
            }
        };

        for frame in frames {
            match frame.command.as_str() {
                "MESSAGE" => {
                    if let Some(update) = self.route(&frame) {
                        if self.tx.send(update).await.is_err() {
                            return Err(ChannelError::Closed);
                        }
                    }
                }
                "ERROR" => {
                    let message = frame.get("message").map(str::to_string).unwrap_or(frame.body);
                    return Err(ChannelError::Stomp(message));
                }
                other => debug!("Ignoring {} frame", other),
            }
        }
        Ok(())
    }

    /// Decode a MESSAGE frame into an update, or log why it was dropped.
    fn route(&self, frame: &Frame) -> Option<Update> {
        match self.decode_frame(frame) {
            Ok(update) => Some(update),
            Err(e) => {
                warn!("Dropping message: {}", e);
                None
            }
        }
    }

    fn decode_frame(&self, frame: &Frame) -> Result<Update, PayloadError> {
        let destination = frame.get("destination").unwrap_or_default();
        let topic = self
            .topic_for(destination)
            .ok_or_else(|| PayloadError::UnknownDestination(destination.to_string()))?;

        let inbound = decode(topic, &frame.body)?;
        debug!("Received {:?} update", topic);
        if topic == Topic::QueryExecution {
            info!("Query execution update: {}", frame.body);
        }
        Ok(inbound.into())
    }

    fn topic_for(&self, destination: &str) -> Option<Topic> {
        self.routes
            .iter()
            .find(|(_, d)| d == destination)
            .map(|(topic, _)| *topic)
    }
}

/// Read until the server answers CONNECT.
async fn await_connected(stream: &mut WsSource) -> Result<(), ChannelError> {
    while let Some(msg) = stream.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        for frame in parse_frames(&text)? {
            match frame.command.as_str() {
                "CONNECTED" => return Ok(()),
                "ERROR" => {
                    let message = frame.get("message").map(str::to_string).unwrap_or(frame.body);
                    return Err(ChannelError::Handshake(message));
                }
                other => debug!("Ignoring {} frame before CONNECTED", other),
            }
        }
    }
    Err(ChannelError::Handshake("connection closed before CONNECTED".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const STATUS_BODY: &str = r#"{"type":"system_status","data":{"totalQueries":5,
        "components":{"coordinator":{"status":"healthy"}}}}"#;

    fn settings(port: u16, reconnect_ms: u64) -> (BackendSettings, ChannelSettings) {
        let backend = BackendSettings {
            host: "127.0.0.1".to_string(),
            port,
            ws_path: "/ws/websocket".to_string(),
            ..BackendSettings::default()
        };
        let channel = ChannelSettings {
            reconnect_delay_ms: reconnect_ms,
            handshake_timeout_ms: 500,
            ..ChannelSettings::default()
        };
        (backend, channel)
    }

    fn message_frame(destination: &str, body: &str) -> Message {
        Message::Text(format!(
            "MESSAGE\ndestination:{}\nsubscription:sub-0\nmessage-id:1\n\n{}\0",
            destination, body
        ))
    }

    /// Accept one WebSocket client, complete the STOMP handshake and return
    /// the stream along with the SUBSCRIBE destinations it sent.
    async fn accept_stomp(listener: &TcpListener) -> (WebSocketStream<TcpStream>, Vec<String>) {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let connect = ws.next().await.unwrap().unwrap();
        let connect = parse_frames(connect.to_text().unwrap()).unwrap();
        assert_eq!(connect[0].command, "CONNECT");

        ws.send(Message::Text("CONNECTED\nversion:1.2\n\n\0".to_string())).await.unwrap();

        let mut destinations = Vec::new();
        while destinations.len() < 3 {
            let msg = ws.next().await.unwrap().unwrap();
            for frame in parse_frames(msg.to_text().unwrap()).unwrap() {
                assert_eq!(frame.command, "SUBSCRIBE");
                destinations.push(frame.get("destination").unwrap().to_string());
            }
        }
        (ws, destinations)
    }

    async fn next_update(rx: &mut mpsc::Receiver<Update>) -> Update {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for update")
            .expect("channel closed")
    }

    #[test]
    fn test_decode_frame_errors() {
        let (backend, channel) = settings(1, 50);
        let (tx, _rx) = mpsc::channel(1);
        let manager = ConnectionManager::new(&backend, &channel, tx, CancelToken::new());

        let frame = |destination: &str, body: &str| Frame {
            body: body.to_string(),
            ..Frame::new("MESSAGE").header("destination", destination)
        };

        match manager.decode_frame(&frame("/topic/other", STATUS_BODY)) {
            Err(PayloadError::UnknownDestination(d)) => assert_eq!(d, "/topic/other"),
            other => panic!("expected unknown destination, got {:?}", other),
        }
        assert!(matches!(
            manager.decode_frame(&frame("/topic/system-status", "{not json")),
            Err(PayloadError::Json(_))
        ));
        assert!(matches!(
            manager.decode_frame(&frame("/topic/system-status", STATUS_BODY)),
            Ok(Update::Status(_))
        ));
        assert!(manager.route(&frame("/topic/other", STATUS_BODY)).is_none());
    }

    #[tokio::test]
    async fn test_subscribes_and_routes_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (backend, channel) = settings(port, 50);
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancelToken::new();
        let handle = ConnectionManager::new(&backend, &channel, tx, shutdown.clone()).spawn();

        let (mut ws, destinations) = accept_stomp(&listener).await;
        assert_eq!(
            destinations,
            vec!["/topic/system-status", "/topic/metrics", "/topic/query-execution"]
        );

        // Heart-beat, malformed JSON and unknown destination are all dropped
        ws.send(Message::Text("\n".to_string())).await.unwrap();
        ws.send(message_frame("/topic/system-status", "{not json")).await.unwrap();
        ws.send(message_frame("/topic/other", STATUS_BODY)).await.unwrap();
        ws.send(message_frame("/topic/system-status", STATUS_BODY)).await.unwrap();

        assert_eq!(next_update(&mut rx).await, Update::Connection(ConnectionState::Connecting));
        assert_eq!(next_update(&mut rx).await, Update::Connection(ConnectionState::Connected));
        match next_update(&mut rx).await {
            Update::Status(status) => {
                assert_eq!(status.total_queries, 5);
                assert_eq!(status.component("coordinator").unwrap().id, "coordinator");
            }
            other => panic!("expected status, got {:?}", other),
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

        // The server sees DISCONNECT before the close
        let msg = ws.next().await.unwrap().unwrap();
        let frames = parse_frames(msg.to_text().unwrap()).unwrap();
        assert_eq!(frames[0].command, "DISCONNECT");
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (backend, channel) = settings(port, 100);
        let (tx, mut rx) = mpsc::channel(64);
        let shutdown = CancelToken::new();
        let handle = ConnectionManager::new(&backend, &channel, tx, shutdown.clone()).spawn();

        // Two sessions, each closed by the server
        for _ in 0..2 {
            let (mut ws, _) = accept_stomp(&listener).await;
            let closed_at = std::time::Instant::now();
            ws.close(None).await.unwrap();
            drop(ws);

            let (ws, _) = accept_stomp(&listener).await;
            assert!(closed_at.elapsed() >= Duration::from_millis(100));
            drop(ws);
        }

        let mut disconnects = 0;
        while let Ok(Some(update)) =
            tokio::time::timeout(Duration::from_millis(300), rx.recv()).await
        {
            if matches!(update, Update::Connection(ConnectionState::Disconnected { .. })) {
                disconnects += 1;
            }
        }
        assert!(disconnects >= 2);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_retries_when_nothing_listens() {
        // Bind then drop to get a port with no listener
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let (backend, channel) = settings(port, 20);
        let (tx, mut rx) = mpsc::channel(64);
        let shutdown = CancelToken::new();
        let handle = ConnectionManager::new(&backend, &channel, tx, shutdown.clone()).spawn();

        let mut attempts = 0;
        while attempts < 3 {
            if next_update(&mut rx).await == Update::Connection(ConnectionState::Connecting) {
                attempts += 1;
            }
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stomp_error_frame_ends_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (backend, channel) = settings(port, 10_000);
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancelToken::new();
        let handle = ConnectionManager::new(&backend, &channel, tx, shutdown.clone()).spawn();

        let (mut ws, _) = accept_stomp(&listener).await;
        ws.send(Message::Text("ERROR\nmessage:broker down\n\n\0".to_string())).await.unwrap();

        loop {
            if let Update::Connection(ConnectionState::Disconnected { reason }) =
                next_update(&mut rx).await
            {
                assert!(reason.unwrap().contains("broker down"));
                break;
            }
        }

        // Shutdown interrupts the long reconnect delay
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_silent_server_times_out_and_retries() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (backend, channel) = settings(port, 50);
        let (tx, mut rx) = mpsc::channel(64);
        let shutdown = CancelToken::new();
        let handle = ConnectionManager::new(&backend, &channel, tx, shutdown.clone()).spawn();

        // Accept the socket and read CONNECT, but never answer it
        let (tcp, _) = listener.accept().await.unwrap();
        let mut silent = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let connect = silent.next().await.unwrap().unwrap();
        assert_eq!(parse_frames(connect.to_text().unwrap()).unwrap()[0].command, "CONNECT");

        loop {
            if let Update::Connection(ConnectionState::Disconnected { reason }) =
                next_update(&mut rx).await
            {
                assert!(reason.unwrap().contains("timed out"));
                break;
            }
        }

        // The next attempt arrives while the server still holds the silent socket
        let (_ws, destinations) =
            tokio::time::timeout(Duration::from_secs(3), accept_stomp(&listener))
                .await
                .expect("no reconnect after handshake timeout");
        assert_eq!(destinations.len(), 3);
        drop(silent);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
