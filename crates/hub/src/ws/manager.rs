use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use overmark_core::{parse_envelope, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type HubSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct HubConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: HubSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active client connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Keyed by client ID -- a client that
/// reconnects under the same ID replaces its previous connection.
pub struct HubManager {
    connections: RwLock<HashMap<String, HubConnection>>,
}

impl HubManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns both halves of the message channel: the receiver so the
    /// caller can forward messages to the WebSocket sink, and a sender
    /// clone identifying this registration for [`remove`](Self::remove).
    pub async fn add(&self, client_id: String) -> (HubSender, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = HubConnection {
            sender: tx.clone(),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(client_id, conn);
        (tx, rx)
    }

    /// Remove a connection by its client ID.
    ///
    /// Removal is guarded by channel identity: when a reconnect has already
    /// replaced the entry under the same id, the stale socket's cleanup
    /// leaves the replacement in place.
    pub async fn remove(&self, client_id: &str, sender: &HubSender) {
        let mut conns = self.connections.write().await;
        if conns
            .get(client_id)
            .is_some_and(|c| c.sender.same_channel(sender))
        {
            conns.remove(client_id);
        }
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Relay a text payload to every connected client except the sender.
    ///
    /// Payloads that do not parse as a sync envelope are dropped without
    /// delivery. Connections whose send channels are closed are pruned.
    /// Returns the number of clients the payload was delivered to.
    pub async fn relay_to_others(&self, sender_id: &str, text: &str) -> usize {
        if parse_envelope(text).is_err() {
            tracing::trace!(client_id = %sender_id, "Dropping unrecognized relay payload");
            return 0;
        }

        let message = Message::Text(text.to_owned().into());
        let mut dead = Vec::new();
        let mut delivered = 0;

        {
            let conns = self.connections.read().await;
            for (id, conn) in conns.iter() {
                if id == sender_id {
                    continue;
                }
                if conn.sender.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(id.clone());
                }
            }
        }

        if !dead.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &dead {
                conns.remove(id);
            }
            tracing::debug!(count = dead.len(), "Pruned closed connections");
        }

        delivered
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all hub connections");
    }
}

impl Default for HubManager {
    fn default() -> Self {
        Self::new()
    }
}
