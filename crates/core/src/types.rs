//! Primitive coordinate and time types shared across the workspace.

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A point in video-frame pixel coordinates. Origin is the top-left of the
/// frame; `y` increases downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale both components, e.g. when mapping from a downsampled frame
    /// back into native resolution.
    pub fn scaled(self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
        }
    }
}

/// A point in model space: the coordinate frame of the loaded 3D reference
/// object, independent of any camera or video. Model "up" is +y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ModelPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
