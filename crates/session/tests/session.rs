//! Integration tests for the overlay session.
//!
//! These start a full session against a synthetic frame source and a
//! scripted detector, with the sync endpoint pointed at a dead address so
//! the channel simply stays disconnected.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::timeout;

use overmark_core::{ModelPoint, TrackingStatus};
use overmark_session::{OverlayFrame, OverlaySession, SessionConfig};
use overmark_sync::SyncConfig;
use overmark_tracking::{
    Candidate, DetectError, DetectionStrategy, FrameDetector, FrameError, FrameSource,
    RemoteDetectorConfig, RunnerConfig, TargetCategories, VideoFrame,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct SyntheticSource {
    releases: Arc<AtomicUsize>,
}

impl FrameSource for SyntheticSource {
    fn acquire(&mut self) -> Result<(), FrameError> {
        Ok(())
    }

    fn grab(&mut self) -> Result<VideoFrame, FrameError> {
        VideoFrame::new(4, 4, vec![0; 4 * 4 * 3])
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedDetector {
    script: Arc<Mutex<VecDeque<Result<Vec<Candidate>, String>>>>,
}

impl FrameDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Candidate>, DetectError> {
        let mut script = self.script.lock().unwrap();
        let step = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Ok(Vec::new()))
        };
        step.map_err(DetectError::Inference)
    }
}

fn bottle_candidate() -> Candidate {
    Candidate {
        category: "bottle".into(),
        confidence: 0.8,
        x: 100.0,
        y: 50.0,
        width: 200.0,
        height: 400.0,
    }
}

fn start_session(
    script: Vec<Result<Vec<Candidate>, String>>,
    releases: Arc<AtomicUsize>,
) -> OverlaySession {
    let source = SyntheticSource { releases };
    let detector = ScriptedDetector {
        script: Arc::new(Mutex::new(script.into())),
    };

    let config = SessionConfig {
        sync: SyncConfig {
            endpoint: "ws://127.0.0.1:1".into(),
            reconnect_delay: Duration::from_secs(60),
        },
        remote: RemoteDetectorConfig::new("http://127.0.0.1:1/unused"),
        runner: RunnerConfig {
            targets: TargetCategories::default(),
            local_interval: Duration::from_millis(5),
        },
        render_interval: Duration::from_millis(5),
        ..SessionConfig::default()
    };

    OverlaySession::start(source, detector, config).expect("synthetic source always acquires")
}

async fn wait_for_frame(
    rx: &mut tokio::sync::watch::Receiver<OverlayFrame>,
    predicate: impl Fn(&OverlayFrame) -> bool,
) -> OverlayFrame {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let frame = rx.borrow_and_update();
                if predicate(&frame) {
                    return frame.clone();
                }
            }
            rx.changed().await.expect("overlay channel open");
        }
    })
    .await
    .expect("timed out waiting for overlay frame")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn annotations_get_composite_ids_in_creation_order() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(vec![Ok(Vec::new())], releases);

    let first = session
        .add_annotation(ModelPoint::new(0.0, 0.9, 0.0), "Cap marker")
        .await
        .unwrap();
    let second = session
        .add_annotation(ModelPoint::new(0.0, 0.0, 0.0), "note")
        .await
        .unwrap();

    assert_eq!(first, format!("{}-0", session.client_id()));
    assert_eq!(second, format!("{}-1", session.client_id()));

    let annotations = session.annotations().await;
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].id, first);
    assert_eq!(annotations[1].id, second);

    session.shutdown().await;
}

#[tokio::test]
async fn remove_and_clear_update_the_local_replica() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(vec![Ok(Vec::new())], releases);

    let id = session
        .add_annotation(ModelPoint::new(0.0, 0.9, 0.0), "Cap marker")
        .await
        .unwrap();
    session
        .add_annotation(ModelPoint::new(0.0, 0.0, 0.0), "note")
        .await
        .unwrap();

    session.remove_annotation(&id).await;
    assert_eq!(session.annotations().await.len(), 1);

    session.clear_annotations().await;
    assert!(session.annotations().await.is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn overlay_carries_markers_once_tracking_locks() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(vec![Ok(vec![bottle_candidate()])], releases);

    session
        .add_annotation(ModelPoint::new(0.0, 0.9, 0.0), "Cap marker")
        .await
        .unwrap();
    session.set_strategy(DetectionStrategy::Local).await;

    let mut overlay = session.overlay();
    let frame = wait_for_frame(&mut overlay, |f| {
        f.status == TrackingStatus::Locked && !f.markers.is_empty()
    })
    .await;

    assert!(frame.bbox.is_some());
    assert_eq!(frame.markers.len(), 1);
    // Calibrated cap anchor inside the 200x400 box at (100, 50).
    assert_eq!(frame.markers[0].position.x, 200.0);
    assert_eq!(frame.markers[0].position.y, 110.0);

    session.shutdown().await;
}

#[tokio::test]
async fn markers_vanish_when_the_target_is_gone() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(
        vec![Ok(vec![bottle_candidate()]), Ok(Vec::new())],
        releases,
    );

    session
        .add_annotation(ModelPoint::new(0.0, 0.9, 0.0), "Cap marker")
        .await
        .unwrap();
    session.set_strategy(DetectionStrategy::Local).await;

    let mut overlay = session.overlay();
    wait_for_frame(&mut overlay, |f| f.status == TrackingStatus::Locked).await;
    let frame = wait_for_frame(&mut overlay, |f| f.status == TrackingStatus::Searching).await;

    assert!(frame.bbox.is_none());
    assert!(frame.markers.is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn sync_channel_stays_optional() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(vec![Ok(Vec::new())], releases);

    // The endpoint is unreachable; local mutations still apply.
    assert!(!session.sync_connected());
    session
        .add_annotation(ModelPoint::new(0.0, 0.0, 0.0), "offline note")
        .await
        .unwrap();
    assert_eq!(session.annotations().await.len(), 1);

    session.shutdown().await;
}

#[tokio::test]
async fn oversized_label_is_rejected() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(vec![Ok(Vec::new())], releases);

    let long = "x".repeat(201);
    let result = session
        .add_annotation(ModelPoint::new(0.0, 0.0, 0.0), long)
        .await;
    assert!(result.is_err());
    assert!(session.annotations().await.is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_releases_the_camera() {
    let releases = Arc::new(AtomicUsize::new(0));
    let session = start_session(vec![Ok(Vec::new())], Arc::clone(&releases));

    session.set_strategy(DetectionStrategy::Local).await;
    session.shutdown().await;

    assert_eq!(releases.load(Ordering::SeqCst), 1);
}
