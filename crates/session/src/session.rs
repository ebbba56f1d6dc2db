//! Overlay session lifecycle.
//!
//! An [`OverlaySession`] owns the camera for its lifetime, schedules the
//! detection strategy, keeps the annotation replica synchronized, and runs
//! the render loop. Everything stops -- and the capture device is released
//! -- on [`shutdown`](OverlaySession::shutdown) or when construction fails
//! partway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use overmark_core::{
    Annotation, AnnotationId, CalibrationTable, CoreError, ModelBounds, ModelPoint,
    SyncEnvelope, TrackingStatus, REMOVE_ALL_ID,
};
use overmark_sync::{AnnotationStore, SyncClient, SyncConfig, SyncHandle};
use overmark_tracking::{
    CameraGuard, DetectionStrategy, FrameDetector, FrameError, FrameSource, RemoteDetector,
    RemoteDetectorConfig, RunnerConfig, StrategyRunner,
};

use crate::render::{start_render_loop, OverlayFrame, DEFAULT_RENDER_INTERVAL};

/// Errors that can abort session startup.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The capture device could not be acquired. Fatal for this session;
    /// there is no automatic retry.
    #[error(transparent)]
    Camera(#[from] FrameError),

    /// Invalid calibration or model bounds.
    #[error(transparent)]
    Config(#[from] CoreError),
}

/// Everything needed to start a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sync: SyncConfig,
    pub remote: RemoteDetectorConfig,
    pub runner: RunnerConfig,
    pub calibration: CalibrationTable,
    pub model_bounds: ModelBounds,
    pub render_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::new("ws://127.0.0.1:3000"),
            remote: RemoteDetectorConfig::new("http://127.0.0.1:8000/detect-target"),
            runner: RunnerConfig::default(),
            calibration: CalibrationTable::bottle(),
            // Reference bottle model: unit height centered on the origin.
            model_bounds: ModelBounds {
                min_x: -0.5,
                max_x: 0.5,
                min_y: -1.0,
                max_y: 1.0,
                min_z: -0.5,
                max_z: 0.5,
            },
            render_interval: DEFAULT_RENDER_INTERVAL,
        }
    }
}

/// A live overlay session for one client.
pub struct OverlaySession {
    client_id: String,
    runner: Arc<StrategyRunner>,
    store: Arc<Mutex<AnnotationStore>>,
    sync: SyncHandle,
    overlay_rx: watch::Receiver<OverlayFrame>,
    cancel: CancellationToken,
}

impl OverlaySession {
    /// Start a session: acquire the camera, connect the sync channel, and
    /// begin rendering. No detection strategy is active until
    /// [`set_strategy`](Self::set_strategy).
    ///
    /// The camera is acquired first; if acquisition fails nothing else is
    /// started and no device handle is leaked.
    pub fn start(
        frame_source: impl FrameSource + 'static,
        detector: impl FrameDetector + 'static,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.model_bounds.validate()?;

        let camera = CameraGuard::acquire(frame_source)?;

        let client_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(client_id = %client_id, "Overlay session starting");

        let store = Arc::new(Mutex::new(AnnotationStore::new(client_id.clone())));
        let cancel = CancellationToken::new();

        let runner = StrategyRunner::new(
            camera,
            detector,
            RemoteDetector::new(config.remote),
            config.runner,
        );

        let (sync, _sync_task) = SyncClient::new(config.sync, client_id.clone(), Arc::clone(&store))
            .spawn(cancel.child_token());

        let (overlay_rx, _render_task) = start_render_loop(
            Arc::clone(runner.state()),
            Arc::clone(&store),
            config.calibration,
            config.model_bounds,
            config.render_interval,
            cancel.child_token(),
        );

        Ok(Self {
            client_id,
            runner,
            store,
            sync,
            overlay_rx,
            cancel,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Latest composed overlay frame.
    pub fn overlay(&self) -> watch::Receiver<OverlayFrame> {
        self.overlay_rx.clone()
    }

    /// Operator-facing tracking status.
    pub fn status(&self) -> watch::Receiver<TrackingStatus> {
        self.runner.state().subscribe_status()
    }

    /// Whether the sync channel currently has an open session.
    pub fn sync_connected(&self) -> bool {
        self.sync.is_connected()
    }

    /// Switch the active detection strategy, stopping the previous one.
    pub async fn set_strategy(&self, strategy: DetectionStrategy) {
        self.runner.activate(strategy).await;
    }

    /// Stop detection, keeping the session (and its annotations) alive.
    pub async fn stop_tracking(&self) {
        self.runner.deactivate().await;
    }

    /// Snapshot of the annotation sequence, in display order.
    pub async fn annotations(&self) -> Vec<Annotation> {
        self.store.lock().await.annotations().to_vec()
    }

    /// Create an annotation locally and broadcast it to peers.
    ///
    /// Applies optimistically: the local replica updates even while the
    /// channel is down, in which case only the broadcast is skipped.
    pub async fn add_annotation(
        &self,
        position: ModelPoint,
        label: impl Into<String>,
    ) -> Result<AnnotationId, SessionError> {
        let label = label.into();
        overmark_core::annotation::validate_label(&label)?;

        let envelope = self
            .store
            .lock()
            .await
            .add(Annotation::new("", position, label));

        // The store assigned the id; it travels inside the envelope.
        let id = match &envelope {
            SyncEnvelope::AnnotationAdded { annotation } => annotation.id.clone(),
            SyncEnvelope::AnnotationRemoved { id } => id.clone(),
        };

        self.sync.publish(envelope);
        Ok(id)
    }

    /// Remove a single annotation and broadcast the removal.
    pub async fn remove_annotation(&self, id: &str) {
        if let Some(envelope) = self.store.lock().await.remove(id) {
            self.sync.publish(envelope);
        }
    }

    /// Clear all annotations locally. Does not propagate to peers (legacy
    /// sentinel behaviour, preserved deliberately).
    pub async fn clear_annotations(&self) {
        let _ = self.store.lock().await.remove(REMOVE_ALL_ID);
    }

    /// End the session: stop all loops and release the capture device.
    pub async fn shutdown(&self) {
        tracing::info!(client_id = %self.client_id, "Overlay session shutting down");
        self.cancel.cancel();
        self.runner.shutdown().await;
    }
}
