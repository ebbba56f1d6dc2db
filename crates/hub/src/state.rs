use std::sync::Arc;

use crate::config::HubConfig;
use crate::ws::HubManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Hub configuration.
    pub config: Arc<HubConfig>,
    /// WebSocket connection manager.
    pub hub: Arc<HubManager>,
}
