//! Strategy runner: schedules detection cycles and publishes results.
//!
//! Exactly one strategy is active at a time, modeled as an explicit
//! [`DetectionStrategy`] variant rather than a shared toggle flag.
//! Activating a strategy cancels the previous strategy's scheduled work
//! (per-strategy child [`CancellationToken`]) before starting the next, so
//! periodic calls never overlap across strategies. Within the remote
//! strategy, individual requests may still overlap in flight; completions
//! publish in arrival order and the last response wins.
//!
//! Stale results -- completions arriving after a strategy was deactivated
//! or the session shut down -- are discarded by checking the cancellation
//! token before any state mutation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use overmark_core::{DetectionBox, DetectionOrigin, Landmarks, TrackingStatus};

use crate::detector::FrameDetector;
use crate::frame::CameraGuard;
use crate::fusion::{fuse, TargetCategories};
use crate::remote::RemoteDetector;
use crate::status::{CycleOutcome, TrackingMachine};

/// Default cadence for the local strategy, bounded by display refresh.
pub const DEFAULT_LOCAL_INTERVAL: Duration = Duration::from_millis(33);

/// Which detection strategy is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    /// In-process detector, once per render opportunity.
    Local,
    /// Remote vision service on a fixed cadence.
    Remote,
}

/// Tunables for the runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Categories the pipeline is allowed to track.
    pub targets: TargetCategories,
    /// Cadence of the local strategy.
    pub local_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            targets: TargetCategories::default(),
            local_interval: DEFAULT_LOCAL_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared tracking state
// ---------------------------------------------------------------------------

/// Latest detection results, shared between the pipeline and its readers.
///
/// Readers subscribe to watch channels and always observe the most recent
/// value without blocking the detection loops.
pub struct TrackingState {
    box_tx: watch::Sender<Option<DetectionBox>>,
    landmarks_tx: watch::Sender<Option<Landmarks>>,
    status_tx: watch::Sender<TrackingStatus>,
    machine: Mutex<TrackingMachine>,
}

impl TrackingState {
    fn new() -> Self {
        let (box_tx, _) = watch::channel(None);
        let (landmarks_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(TrackingStatus::Searching);
        Self {
            box_tx,
            landmarks_tx,
            status_tx,
            machine: Mutex::new(TrackingMachine::new()),
        }
    }

    /// Latest fused detection box (`None` while nothing is detected).
    pub fn subscribe_box(&self) -> watch::Receiver<Option<DetectionBox>> {
        self.box_tx.subscribe()
    }

    /// Latest remote landmarks, when the active strategy provides them.
    pub fn subscribe_landmarks(&self) -> watch::Receiver<Option<Landmarks>> {
        self.landmarks_tx.subscribe()
    }

    /// Operator-facing tracking status.
    pub fn subscribe_status(&self) -> watch::Receiver<TrackingStatus> {
        self.status_tx.subscribe()
    }

    /// Apply one cycle's outcome: advance the status machine and replace
    /// the published box and landmarks.
    async fn publish(&self, outcome: CycleOutcome, landmarks: Option<Landmarks>) {
        let status = self.machine.lock().await.apply(&outcome);
        let bbox = match outcome {
            CycleOutcome::Found(b) => Some(b),
            CycleOutcome::Empty | CycleOutcome::Failed => None,
        };
        self.box_tx.send_replace(bbox);
        self.landmarks_tx.send_replace(landmarks);
        self.status_tx.send_replace(status);
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Bookkeeping for the currently scheduled strategy.
struct ActiveStrategy {
    strategy: DetectionStrategy,
    /// Child of the master token; cancelled on switch/deactivate.
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Owns the camera, the caller-constructed detector, and the remote client,
/// and schedules whichever strategy is active.
///
/// Created once per session via [`StrategyRunner::new`]; the returned `Arc`
/// can be cheaply cloned into the session and render layers.
pub struct StrategyRunner {
    camera: Arc<Mutex<CameraGuard>>,
    detector: Arc<Mutex<Box<dyn FrameDetector>>>,
    remote: Arc<RemoteDetector>,
    targets: Arc<TargetCategories>,
    local_interval: Duration,
    state: Arc<TrackingState>,
    active: Mutex<Option<ActiveStrategy>>,
    /// Master cancellation token -- cancelled during session shutdown.
    cancel: CancellationToken,
}

impl StrategyRunner {
    /// Build a runner around an acquired camera and a caller-owned
    /// detector. No strategy is active until [`activate`](Self::activate)
    /// is called.
    pub fn new(
        camera: CameraGuard,
        detector: impl FrameDetector + 'static,
        remote: RemoteDetector,
        config: RunnerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            camera: Arc::new(Mutex::new(camera)),
            detector: Arc::new(Mutex::new(Box::new(detector))),
            remote: Arc::new(remote),
            targets: Arc::new(config.targets),
            local_interval: config.local_interval,
            state: Arc::new(TrackingState::new()),
            active: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Shared tracking state for subscribers.
    pub fn state(&self) -> &Arc<TrackingState> {
        &self.state
    }

    /// The currently scheduled strategy, if any.
    pub async fn active_strategy(&self) -> Option<DetectionStrategy> {
        self.active.lock().await.as_ref().map(|a| a.strategy)
    }

    /// Schedule a strategy, stopping the previous one first.
    ///
    /// Re-activating the already-active strategy restarts its loop (and
    /// for the remote strategy, triggers an immediate call).
    pub async fn activate(self: &Arc<Self>, strategy: DetectionStrategy) {
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            stop(prev);
        }

        let token = self.cancel.child_token();
        let task = match strategy {
            DetectionStrategy::Local => tokio::spawn(local_loop(
                Arc::clone(&self.state),
                Arc::clone(&self.camera),
                Arc::clone(&self.detector),
                Arc::clone(&self.targets),
                self.local_interval,
                token.clone(),
            )),
            DetectionStrategy::Remote => tokio::spawn(remote_loop(
                Arc::clone(&self.state),
                Arc::clone(&self.camera),
                Arc::clone(&self.remote),
                token.clone(),
            )),
        };

        tracing::info!(strategy = ?strategy, "Detection strategy activated");
        *active = Some(ActiveStrategy {
            strategy,
            cancel: token,
            task,
        });
    }

    /// Stop the active strategy, leaving the last published state in place.
    pub async fn deactivate(&self) {
        if let Some(prev) = self.active.lock().await.take() {
            tracing::info!(strategy = ?prev.strategy, "Detection strategy deactivated");
            stop(prev);
        }
    }

    /// Shut down: stop scheduled work and release the capture device.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.deactivate().await;
        self.camera.lock().await.release();
    }
}

/// Cancel a strategy's scheduled work and drop its task.
fn stop(active: ActiveStrategy) {
    active.cancel.cancel();
    active.task.abort();
}

// ---------------------------------------------------------------------------
// Strategy loops
// ---------------------------------------------------------------------------

/// Local strategy: one detection cycle per display opportunity.
async fn local_loop(
    state: Arc<TrackingState>,
    camera: Arc<Mutex<CameraGuard>>,
    detector: Arc<Mutex<Box<dyn FrameDetector>>>,
    targets: Arc<TargetCategories>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Local detection loop stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let outcome = local_cycle(&camera, &detector, &targets).await;
        if cancel.is_cancelled() {
            return;
        }
        state.publish(outcome, None).await;
    }
}

/// Run a single local detection cycle. Errors collapse to `Failed`; the
/// loop always continues with the next cycle.
async fn local_cycle(
    camera: &Arc<Mutex<CameraGuard>>,
    detector: &Arc<Mutex<Box<dyn FrameDetector>>>,
    targets: &TargetCategories,
) -> CycleOutcome {
    let frame = match camera.lock().await.grab() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Frame grab failed");
            return CycleOutcome::Failed;
        }
    };

    match detector.lock().await.detect(&frame) {
        Ok(candidates) => match fuse(&candidates, targets, DetectionOrigin::Local) {
            Some(bbox) => CycleOutcome::Found(bbox),
            None => CycleOutcome::Empty,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Local detection cycle failed");
            CycleOutcome::Failed
        }
    }
}

/// Remote strategy: fixed cadence with an immediate first call.
///
/// Each tick issues a new request even if the previous one is still in
/// flight; completions are unordered and the last to arrive wins.
async fn remote_loop(
    state: Arc<TrackingState>,
    camera: Arc<Mutex<CameraGuard>>,
    remote: Arc<RemoteDetector>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(remote.config().cadence);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Remote detection loop stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let frame = match camera.lock().await.grab() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Frame grab failed");
                state.publish(CycleOutcome::Failed, None).await;
                continue;
            }
        };

        let state = Arc::clone(&state);
        let remote = Arc::clone(&remote);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = remote.detect(&frame).await;

            // A response that lands after deactivation must not be applied.
            if cancel.is_cancelled() {
                tracing::trace!("Discarding stale remote detection result");
                return;
            }

            match result {
                Ok(Some((bbox, landmarks))) => {
                    state.publish(CycleOutcome::Found(bbox), landmarks).await;
                }
                Ok(None) => state.publish(CycleOutcome::Empty, None).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Remote detection cycle failed");
                    state.publish(CycleOutcome::Failed, None).await;
                }
            }
        });
    }
}
