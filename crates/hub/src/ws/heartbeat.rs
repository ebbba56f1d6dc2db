use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::HubManager;

/// Spawn a background task that sends periodic Ping frames to all connected
/// clients.
///
/// The task runs until aborted via the returned `JoinHandle` during
/// shutdown.
pub fn start_heartbeat(hub: Arc<HubManager>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let count = hub.connection_count().await;
            tracing::debug!(count, "Hub heartbeat ping");
            hub.ping_all().await;
        }
    })
}
