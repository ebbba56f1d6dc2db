//! `overmark-core` -- shared domain types for the Overmark overlay platform.
//!
//! This crate has no internal dependencies so that the tracking pipeline,
//! sync layer, session orchestration, and relay hub can all reference the
//! same annotation, detection, and wire-protocol types.

pub mod annotation;
pub mod calibration;
pub mod detection;
pub mod error;
pub mod protocol;
pub mod resolve;
pub mod types;

pub use annotation::{AnchorCategory, Annotation, AnnotationId};
pub use calibration::{AnchorPoint, CalibrationEntry, CalibrationTable, ModelBounds};
pub use detection::{DetectionBox, DetectionOrigin, Landmarks, TrackingStatus};
pub use error::CoreError;
pub use protocol::{parse_envelope, SyncEnvelope, REMOVE_ALL_ID};
pub use types::{ModelPoint, PixelPoint, Timestamp};
