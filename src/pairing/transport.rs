//! Bridge WebSocket transport.
//!
//! Keeps one WebSocket open to the bridge server, subscribes to our topics,
//! and forwards every `pub` frame to the connector. Outgoing frames are
//! queued on a channel and flushed whenever a connection is up. Reconnects
//! with exponential backoff and re-subscribes to every topic seen so far.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

use super::types::{SocketMessage, SocketMessageKind};

/// Events from the transport task to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(String),
    Disconnected(String),
    Message(SocketMessage),
}

/// Convert the bridge's HTTP URL into its WebSocket URL.
///
/// `https://bridge.walletconnect.org` → `wss://bridge.walletconnect.org`
pub fn bridge_ws_url(bridge: &str) -> String {
    bridge
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1)
}

/// Handle to the transport task.
#[derive(Debug)]
pub struct BridgeSocket {
    outgoing: mpsc::UnboundedSender<SocketMessage>,
    shutdown: Option<watch::Sender<bool>>,
}

impl BridgeSocket {
    /// Spawn the transport task. Returns the handle and the event stream.
    pub fn start(
        bridge: &str,
        topics: Vec<String>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(run(
            bridge_ws_url(bridge),
            topics,
            outgoing_rx,
            event_tx,
            shutdown_rx,
        ));

        let socket = Self {
            outgoing: outgoing_tx,
            shutdown: Some(shutdown_tx),
        };
        (socket, event_rx)
    }

    /// A socket with no task behind it; frames land on the returned receiver.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<SocketMessage>) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let socket = Self {
            outgoing: outgoing_tx,
            shutdown: None,
        };
        (socket, outgoing_rx)
    }

    pub fn send(&self, message: SocketMessage) -> Result<(), super::PairingError> {
        self.outgoing
            .send(message)
            .map_err(|_| super::PairingError::TransportClosed)
    }

    /// Stop the transport task after it flushes what it is currently sending.
    pub fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
    }
}

impl Drop for BridgeSocket {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run(
    ws_url: String,
    mut topics: Vec<String>,
    mut outgoing: mpsc::UnboundedReceiver<SocketMessage>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    shutdown: watch::Receiver<bool>,
) {
    let mut backoff_secs = 1u64;
    let max_backoff = 60u64;

    loop {
        if *shutdown.borrow() {
            log::info!("🛑 Bridge socket shutting down");
            break;
        }

        log::info!("📡 Connecting to bridge at {}...", ws_url);

        match tokio_tungstenite::connect_async(ws_url.as_str()).await {
            Ok((ws_stream, _response)) => {
                log::info!("✅ Bridge connected: {}", ws_url);
                backoff_secs = 1;
                let _ = event_tx.send(TransportEvent::Connected(ws_url.clone()));

                let result = handle_connection(
                    ws_stream,
                    &mut topics,
                    &mut outgoing,
                    &event_tx,
                    shutdown.clone(),
                )
                .await;

                match result {
                    Ok(()) => log::info!("Bridge connection closed normally"),
                    Err(e) => log::warn!("⚠️ Bridge connection error: {}", e),
                }

                let _ = event_tx.send(TransportEvent::Disconnected(ws_url.clone()));
            }
            Err(e) => {
                log::warn!(
                    "⚠️ Bridge connection failed: {} (retry in {}s)",
                    e,
                    backoff_secs
                );
            }
        }

        if *shutdown.borrow() || event_tx.is_closed() {
            break;
        }

        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
        backoff_secs = (backoff_secs * 2).min(max_backoff);
    }
}

async fn handle_connection(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    topics: &mut Vec<String>,
    outgoing: &mut mpsc::UnboundedReceiver<SocketMessage>,
    event_tx: &mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    for topic in topics.iter() {
        let json = serde_json::to_string(&SocketMessage::subscribe(topic))?;
        ws_sender.send(Message::Text(json)).await?;
    }
    log::debug!("📡 Subscribed to {} topics", topics.len());

    let mut heartbeat = tokio::time::interval(std::time::Duration::from_secs(25));

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&text, event_tx);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sender.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        log::info!("Bridge closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        return Err(Box::new(e));
                    }
                    _ => {}
                }
            }

            Some(frame) = outgoing.recv() => {
                if frame.kind == SocketMessageKind::Sub && !topics.contains(&frame.topic) {
                    topics.push(frame.topic.clone());
                }
                let json = serde_json::to_string(&frame)?;
                log::debug!("→ bridge {:?} {}", frame.kind, frame.topic);
                ws_sender.send(Message::Text(json)).await?;
            }

            _ = heartbeat.tick() => {
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    // Flush what was queued before close (e.g. the kill-session update)
                    while let Ok(frame) = outgoing.try_recv() {
                        let json = serde_json::to_string(&frame)?;
                        ws_sender.send(Message::Text(json)).await?;
                    }
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_frame(text: &str, event_tx: &mpsc::UnboundedSender<TransportEvent>) {
    match serde_json::from_str::<SocketMessage>(text) {
        Ok(msg) if msg.kind == SocketMessageKind::Pub => {
            log::debug!("← bridge pub {}", msg.topic);
            let _ = event_tx.send(TransportEvent::Message(msg));
        }
        Ok(msg) => {
            log::debug!("Ignoring bridge {:?} frame on {}", msg.kind, msg.topic);
        }
        Err(e) => {
            log::debug!("Failed to parse bridge frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_ws_url() {
        assert_eq!(
            bridge_ws_url("https://bridge.walletconnect.org"),
            "wss://bridge.walletconnect.org"
        );
        assert_eq!(bridge_ws_url("http://127.0.0.1:5001"), "ws://127.0.0.1:5001");
    }

    #[test]
    fn test_handle_frame_forwards_pub_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_frame(r#"{"topic":"a","type":"pub","payload":"x","silent":true}"#, &tx);
        handle_frame(r#"{"topic":"a","type":"ack","payload":""}"#, &tx);
        handle_frame("not json", &tx);

        match rx.try_recv() {
            Ok(TransportEvent::Message(msg)) => {
                assert_eq!(msg.topic, "a");
                assert_eq!(msg.payload, "x");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_detached_socket_queues_frames() {
        let (socket, mut rx) = BridgeSocket::detached();
        socket.send(SocketMessage::subscribe("topic")).unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame, SocketMessage::subscribe("topic"));
    }
}
