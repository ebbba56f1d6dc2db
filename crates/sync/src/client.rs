//! Persistent sync channel client.
//!
//! Connects to the relay hub's WebSocket endpoint and keeps the local
//! [`AnnotationStore`] in step with peers: inbound envelopes apply to the
//! store (never re-broadcast), outbound envelopes from local mutations are
//! sent while a session is open. On close the client reconnects after a
//! fixed delay, indefinitely, until the session is cancelled. Reconnecting
//! does not resynchronize existing annotation state -- there is no
//! snapshot/resume protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use overmark_core::{parse_envelope, SyncEnvelope};

use crate::store::AnnotationStore;

/// Fixed delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sync channel configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hub base URL, e.g. `ws://host:3000`. The per-client path is
    /// appended automatically.
    pub endpoint: String,
    pub reconnect_delay: Duration,
}

impl SyncConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default               |
    /// |---------------------------|-----------------------|
    /// | `SYNC_WS_URL`             | `ws://127.0.0.1:3000` |
    /// | `SYNC_RECONNECT_DELAY_MS` | `3000`                |
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("SYNC_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:3000".into());
        let delay_ms: u64 = std::env::var("SYNC_RECONNECT_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RECONNECT_DELAY.as_millis() as u64);

        Self {
            endpoint,
            reconnect_delay: Duration::from_millis(delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle for broadcasting local mutations.
///
/// Publishing is gated on channel connectivity: while no session is open,
/// envelopes are dropped rather than queued -- the local replica already
/// applied the mutation, only the broadcast is skipped.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncEnvelope>,
    connected: Arc<AtomicBool>,
}

impl SyncHandle {
    fn new(tx: mpsc::UnboundedSender<SyncEnvelope>, connected: Arc<AtomicBool>) -> Self {
        Self { tx, connected }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Broadcast an envelope to peers if the channel is currently open.
    pub fn publish(&self, envelope: SyncEnvelope) {
        if !self.is_connected() {
            tracing::trace!("Sync channel closed; skipping broadcast");
            return;
        }
        let _ = self.tx.send(envelope);
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Reconnecting sync channel client.
pub struct SyncClient {
    config: SyncConfig,
    client_id: String,
    store: Arc<Mutex<AnnotationStore>>,
}

impl SyncClient {
    pub fn new(config: SyncConfig, client_id: impl Into<String>, store: Arc<Mutex<AnnotationStore>>) -> Self {
        Self {
            config,
            client_id: client_id.into(),
            store,
        }
    }

    /// Spawn the connection loop.
    ///
    /// Returns the broadcast handle plus the task handle; the loop runs
    /// until `cancel` is triggered.
    pub fn spawn(self, cancel: CancellationToken) -> (SyncHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let handle = SyncHandle::new(tx, Arc::clone(&connected));

        let task = tokio::spawn(self.run(rx, connected, cancel));
        (handle, task)
    }

    /// Connection loop: connect, drive a session, reconnect after a fixed
    /// delay when it ends. Runs until cancelled.
    async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<SyncEnvelope>,
        connected: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) {
        let url = format!(
            "{}/ws/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.client_id
        );

        loop {
            tracing::info!(url = %url, "Connecting to sync channel");

            tokio::select! {
                _ = cancel.cancelled() => return,
                result = connect_async(&url) => match result {
                    Ok((ws_stream, _response)) => {
                        tracing::info!(client_id = %self.client_id, "Sync channel connected");
                        connected.store(true, Ordering::SeqCst);
                        run_session(ws_stream, &self.store, &mut outbound, &cancel).await;
                        connected.store(false, Ordering::SeqCst);
                        tracing::warn!("Sync channel session ended");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Sync channel connection failed");
                    }
                }
            }

            if cancel.is_cancelled() {
                return;
            }

            // Fixed delay, then try again. Forever.
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }
}

/// Drive a single channel session until it closes, errors, or the client
/// is cancelled.
async fn run_session(
    ws_stream: WsStream,
    store: &Arc<Mutex<AnnotationStore>>,
    outbound: &mut mpsc::UnboundedReceiver<SyncEnvelope>,
    cancel: &CancellationToken,
) {
    let (mut sink, mut stream) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            Some(envelope) = outbound.recv() => {
                let text = match serde_json::to_string(&envelope) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode sync envelope");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    tracing::debug!("Sync channel sink closed");
                    return;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => apply_incoming(store, text.as_ref()).await,
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Sync channel closed by peer");
                    return;
                }
                Some(Ok(_)) => {
                    // Ping/pong handled by tungstenite; binary unused.
                }
                Some(Err(e)) => {
                    // Logged, and the session ends; the outer loop owns
                    // the single reconnect trigger.
                    tracing::error!(error = %e, "Sync channel receive error");
                    return;
                }
                None => return,
            }
        }
    }
}

/// Apply an inbound message to the local replica.
///
/// Unrecognized or malformed messages are dropped without mutating state.
async fn apply_incoming(store: &Arc<Mutex<AnnotationStore>>, text: &str) {
    match parse_envelope(text) {
        Ok(envelope) => store.lock().await.apply(envelope),
        Err(_) => {
            tracing::trace!("Ignoring unrecognized sync message");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use overmark_core::{Annotation, ModelPoint};

    #[tokio::test]
    async fn publish_is_dropped_while_disconnected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SyncHandle::new(tx, Arc::new(AtomicBool::new(false)));

        handle.publish(SyncEnvelope::AnnotationRemoved { id: "a1".into() });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_forwards_while_connected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SyncHandle::new(tx, Arc::new(AtomicBool::new(true)));

        handle.publish(SyncEnvelope::AnnotationRemoved { id: "a1".into() });
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEnvelope::AnnotationRemoved { id: "a1".into() }
        );
    }

    #[tokio::test]
    async fn malformed_incoming_message_is_ignored() {
        let store = Arc::new(Mutex::new(AnnotationStore::new("c1")));
        store.lock().await.add(Annotation::new(
            "keep",
            ModelPoint::new(0.0, 0.0, 0.0),
            "marker",
        ));

        apply_incoming(&store, "{\"type\":\"unknown_kind\"}").await;
        apply_incoming(&store, "not json").await;

        assert_eq!(store.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn valid_incoming_removal_applies_without_echo() {
        let store = Arc::new(Mutex::new(AnnotationStore::new("c1")));
        store.lock().await.add(Annotation::new(
            "a1",
            ModelPoint::new(0.0, 0.0, 0.0),
            "marker",
        ));

        apply_incoming(&store, "{\"type\":\"annotation_removed\",\"id\":\"a1\"}").await;
        assert!(store.lock().await.is_empty());
    }
}
