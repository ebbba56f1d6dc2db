//! In-process detector boundary.
//!
//! The local strategy runs a lightweight detector against every frame. The
//! detector itself is an external collaborator (model inference lives in the
//! embedding environment); this module defines the trait it plugs into and
//! the configuration handed to it. The detector object is explicitly
//! constructed by the caller and passed into the pipeline at session start
//! -- there is no shared global instance.

use crate::frame::VideoFrame;

/// Default minimum score for local detections.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;

/// Default cap on candidates returned per frame.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Configuration for constructing an in-process detector.
#[derive(Debug, Clone)]
pub struct LocalDetectorConfig {
    /// Path to the detection model asset.
    pub model_asset_path: String,
    /// Minimum confidence for a candidate to be reported.
    pub score_threshold: f32,
    /// Maximum number of candidates per frame.
    pub max_results: usize,
    /// Inference mode hint for the backend (`"video"` for frame streams).
    pub running_mode: String,
}

impl LocalDetectorConfig {
    pub fn new(model_asset_path: impl Into<String>) -> Self {
        Self {
            model_asset_path: model_asset_path.into(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            running_mode: "video".into(),
        }
    }
}

/// One raw detection candidate, before category filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Detector category label, e.g. `"bottle"`.
    pub category: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Errors from a detection attempt.
///
/// At the pipeline boundary an error collapses to "no detection this
/// cycle"; the tracking state machine separately reports it as `Lost`.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Remote detection failed: {0}")]
    Remote(String),

    #[error("Frame unavailable: {0}")]
    Frame(#[from] crate::frame::FrameError),
}

/// Trait for in-process detection backends.
///
/// Implementations run inference over a frame and return every candidate
/// above their configured threshold; category filtering and selection
/// happen downstream in [`fuse`](crate::fusion::fuse).
pub trait FrameDetector: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Candidate>, DetectError>;
}
