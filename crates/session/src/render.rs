//! Overlay frame composition and the render loop.
//!
//! Every display cycle the render loop reads the latest detection box,
//! tracking status, landmarks, and annotation sequence -- without blocking
//! on detection or network completion -- and composes an [`OverlayFrame`]:
//! the box outline, landmark anchor dots, and one marker per resolvable
//! annotation. With no usable box the frame carries no markers at all.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use overmark_core::{
    resolve, Annotation, AnnotationId, CalibrationTable, DetectionBox, Landmarks, ModelBounds,
    PixelPoint, TrackingStatus,
};
use overmark_sync::AnnotationStore;
use overmark_tracking::TrackingState;

/// Default display cadence (~60 Hz).
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(16);

/// A single annotation marker positioned on the video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: AnnotationId,
    pub label: String,
    pub position: PixelPoint,
}

/// One composed overlay: everything the presentation layer draws for a
/// display cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayFrame {
    pub status: TrackingStatus,
    /// Box outline, present only when the detection is usable.
    pub bbox: Option<DetectionBox>,
    /// Landmark anchor dots (remote strategy only).
    pub anchors: Vec<PixelPoint>,
    /// Resolved annotation markers, in store (display) order.
    pub markers: Vec<Marker>,
}

/// Compose an overlay frame from the current shared state.
pub fn compose(
    status: TrackingStatus,
    bbox: Option<&DetectionBox>,
    landmarks: Option<&Landmarks>,
    annotations: &[Annotation],
    table: &CalibrationTable,
    bounds: &ModelBounds,
) -> OverlayFrame {
    let usable = bbox.filter(|b| b.is_usable());

    let anchors = match (usable, landmarks) {
        (Some(_), Some(lm)) => vec![lm.cap, lm.middle, lm.bottom],
        _ => Vec::new(),
    };

    let markers = annotations
        .iter()
        .filter_map(|a| {
            resolve::resolve_auto(a, usable, table, bounds).map(|position| Marker {
                id: a.id.clone(),
                label: a.label.clone(),
                position,
            })
        })
        .collect();

    OverlayFrame {
        status,
        bbox: usable.cloned(),
        anchors,
        markers,
    }
}

/// Spawn the render loop.
///
/// Publishes the latest [`OverlayFrame`] on a watch channel every
/// `interval` until cancelled.
pub fn start_render_loop(
    state: Arc<TrackingState>,
    store: Arc<Mutex<AnnotationStore>>,
    table: CalibrationTable,
    bounds: ModelBounds,
    interval: Duration,
    cancel: CancellationToken,
) -> (watch::Receiver<OverlayFrame>, tokio::task::JoinHandle<()>) {
    let (frame_tx, frame_rx) = watch::channel(OverlayFrame::default());

    let mut box_rx = state.subscribe_box();
    let mut landmarks_rx = state.subscribe_landmarks();
    let mut status_rx = state.subscribe_status();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Render loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let bbox = box_rx.borrow_and_update().clone();
            let landmarks = landmarks_rx.borrow_and_update().clone();
            let status = *status_rx.borrow_and_update();
            let annotations = store.lock().await.annotations().to_vec();

            let frame = compose(
                status,
                bbox.as_ref(),
                landmarks.as_ref(),
                &annotations,
                &table,
                &bounds,
            );
            frame_tx.send_replace(frame);
        }
    });

    (frame_rx, task)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
