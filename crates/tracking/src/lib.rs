//! `overmark-tracking` -- detector fusion pipeline and tracking status.
//!
//! Locates the physical target in the video feed using one of two mutually
//! exclusive strategies (in-process detector vs. remote vision service),
//! publishes the latest [`DetectionBox`](overmark_core::DetectionBox) over a
//! watch channel, and derives the operator-facing tracking status from the
//! per-cycle outcome stream.

pub mod detector;
pub mod frame;
pub mod fusion;
pub mod remote;
pub mod runner;
pub mod status;

pub use detector::{Candidate, DetectError, FrameDetector, LocalDetectorConfig};
pub use frame::{CameraGuard, FrameError, FrameSource, VideoFrame};
pub use fusion::{fuse, TargetCategories};
pub use remote::{RemoteDetector, RemoteDetectorConfig};
pub use runner::{DetectionStrategy, RunnerConfig, StrategyRunner, TrackingState};
pub use status::{CycleOutcome, TrackingMachine};
