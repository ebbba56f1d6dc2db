use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::manager::HubManager;

/// HTTP handler that upgrades `/ws/{client_id}` to a WebSocket.
///
/// After the upgrade the connection is registered with `HubManager` and
/// managed by two tasks (sender + receiver). Connecting again under the
/// same client ID replaces the previous connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state.hub))
}

/// Manage a single client connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `HubManager`.
///   2. Spawns a sender task that forwards relayed messages to the sink.
///   3. Relays inbound text payloads to the other clients.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, client_id: String, hub: Arc<HubManager>) {
    tracing::info!(client_id = %client_id, "Client connected");

    // Register and get the receiver for outbound messages. The sender half
    // identifies this registration during cleanup.
    let (tx, mut rx) = hub.add(client_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward relayed messages to the WebSocket sink.
    let sender_client_id = client_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(client_id = %sender_client_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: relay inbound envelopes to everyone else.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let delivered = hub.relay_to_others(&client_id, text.as_str()).await;
                tracing::trace!(client_id = %client_id, delivered, "Relayed payload");
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(client_id = %client_id, "Pong received");
            }
            Ok(_) => {
                // Binary frames are not part of the protocol.
            }
            Err(e) => {
                tracing::debug!(client_id = %client_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove this registration (not a replacement that took over
    // the id) and abort the sender task.
    hub.remove(&client_id, &tx).await;
    send_task.abort();
    tracing::info!(client_id = %client_id, "Client disconnected");
}
