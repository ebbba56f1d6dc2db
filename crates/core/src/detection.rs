//! Detection results and tracking status.
//!
//! A [`DetectionBox`] identifies the tracked physical object in the current
//! video frame. Boxes are recomputed every detection cycle and replaced,
//! never mutated. A box with non-positive width or height counts as "no
//! detection" everywhere it is consumed -- callers must go through
//! [`DetectionBox::is_usable`] before reading its geometry.

use serde::{Deserialize, Serialize};

use crate::types::PixelPoint;

// ---------------------------------------------------------------------------
// DetectionBox
// ---------------------------------------------------------------------------

/// Which detection strategy produced a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionOrigin {
    /// In-process detector, once per render opportunity.
    Local,
    /// Remote vision-reasoning service, on a fixed cadence.
    Remote,
}

/// Rectangular pixel region locating the tracked object in the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    /// Left edge, pixels from the frame's left border.
    pub x: f64,
    /// Top edge, pixels from the frame's top border.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector category label, e.g. `"bottle"`.
    pub category: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    pub origin: DetectionOrigin,
}

impl DetectionBox {
    /// A degenerate box (non-positive width or height) is treated as "no
    /// detection" by every consumer.
    pub fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Rescale origin and size, e.g. from downsample space back into the
    /// native frame: `sx = native_w / down_w`, `sy = native_h / down_h`.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
            category: self.category.clone(),
            confidence: self.confidence,
            origin: self.origin,
        }
    }
}

// ---------------------------------------------------------------------------
// Landmarks
// ---------------------------------------------------------------------------

/// Named sub-part positions optionally returned by the remote detector,
/// in the same coordinate frame as the accompanying box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub cap: PixelPoint,
    pub middle: PixelPoint,
    pub bottom: PixelPoint,
}

impl Landmarks {
    /// Rescale all landmark positions with the same factors as the box.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            cap: self.cap.scaled(sx, sy),
            middle: self.middle.scaled(sx, sy),
            bottom: self.bottom.scaled(sx, sy),
        }
    }
}

// ---------------------------------------------------------------------------
// TrackingStatus
// ---------------------------------------------------------------------------

/// Operator-facing classification of whether the physical target is
/// currently located in the video feed.
///
/// One instance per session; mutated only by the tracking state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    /// No target in the current cycle (also the initial state).
    #[default]
    Searching,
    /// The current cycle produced a usable box.
    Locked,
    /// The current cycle's detection attempt failed outright.
    Lost,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::Locked => "locked",
            Self::Lost => "lost",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_box(x: f64, y: f64, w: f64, h: f64) -> DetectionBox {
        DetectionBox {
            x,
            y,
            width: w,
            height: h,
            category: "bottle".into(),
            confidence: 0.8,
            origin: DetectionOrigin::Remote,
        }
    }

    #[test]
    fn zero_or_negative_extent_is_unusable() {
        assert!(!remote_box(0.0, 0.0, 0.0, 10.0).is_usable());
        assert!(!remote_box(0.0, 0.0, 10.0, 0.0).is_usable());
        assert!(!remote_box(0.0, 0.0, -5.0, 10.0).is_usable());
        assert!(remote_box(0.0, 0.0, 1.0, 1.0).is_usable());
    }

    #[test]
    fn downsample_rescale_round_trip() {
        // Remote bbox (160,120,50,50) at downsample 320x240, native 1280x720.
        let b = remote_box(160.0, 120.0, 50.0, 50.0);
        let scaled = b.scaled(1280.0 / 320.0, 720.0 / 240.0);
        assert_eq!(scaled.x, 640.0);
        assert_eq!(scaled.y, 360.0);
        assert_eq!(scaled.width, 200.0);
        assert_eq!(scaled.height, 150.0);
    }

    #[test]
    fn landmarks_scale_with_box() {
        let lm = Landmarks {
            cap: PixelPoint::new(10.0, 20.0),
            middle: PixelPoint::new(10.0, 60.0),
            bottom: PixelPoint::new(10.0, 100.0),
        };
        let scaled = lm.scaled(2.0, 3.0);
        assert_eq!(scaled.cap, PixelPoint::new(20.0, 60.0));
        assert_eq!(scaled.bottom, PixelPoint::new(20.0, 300.0));
    }

    #[test]
    fn status_defaults_to_searching() {
        assert_eq!(TrackingStatus::default(), TrackingStatus::Searching);
    }
}
