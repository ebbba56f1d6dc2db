use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;
use crate::ws;

/// Build the hub's route table. Middleware layers are applied by the
/// binary around this router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ws/{client_id}", get(ws::ws_handler))
}

/// Liveness probe with the current connection count.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connections = state.hub.connection_count().await;
    Json(json!({
        "status": "ok",
        "connections": connections,
    }))
}
