//! Static anchor calibration and model bounds.
//!
//! The calibration table maps anchor categories to normalized positions
//! inside a detection box. It is fixed at session start; there is no runtime
//! recalibration. [`ModelBounds`] describes the reference object's extent in
//! model space and backs the continuous linear fallback mapping used for
//! annotations without a named category.

use serde::{Deserialize, Serialize};

use crate::annotation::AnchorCategory;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Anchor points
// ---------------------------------------------------------------------------

/// A normalized (fractional) point inside a detection box, both components
/// in `[0, 1]`. `(0, 0)` is the box's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub x_fraction: f64,
    pub y_fraction: f64,
}

impl AnchorPoint {
    pub fn new(x_fraction: f64, y_fraction: f64) -> Self {
        Self {
            x_fraction,
            y_fraction,
        }
    }
}

/// One category → anchor association.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    pub category: AnchorCategory,
    pub anchor: AnchorPoint,
}

// ---------------------------------------------------------------------------
// Calibration table
// ---------------------------------------------------------------------------

/// Anchor used when no category matches.
pub const DEFAULT_ANCHOR: AnchorPoint = AnchorPoint {
    x_fraction: 0.5,
    y_fraction: 0.5,
};

/// Ordered category → anchor table, fixed at session start.
///
/// Lookup checks entries in table order: explicit category tag first, then
/// substring classification of the label for untagged (`Body`) annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    entries: Vec<CalibrationEntry>,
    default_anchor: AnchorPoint,
}

impl CalibrationTable {
    /// Build a table from explicit entries and a default anchor.
    pub fn new(entries: Vec<CalibrationEntry>, default_anchor: AnchorPoint) -> Self {
        Self {
            entries,
            default_anchor,
        }
    }

    /// Fixed bottle geometry: cap near the top, middle at the center,
    /// bottom near the base.
    pub fn bottle() -> Self {
        Self::new(
            vec![
                CalibrationEntry {
                    category: AnchorCategory::Cap,
                    anchor: AnchorPoint::new(0.5, 0.15),
                },
                CalibrationEntry {
                    category: AnchorCategory::Middle,
                    anchor: AnchorPoint::new(0.5, 0.5),
                },
                CalibrationEntry {
                    category: AnchorCategory::Bottom,
                    anchor: AnchorPoint::new(0.5, 0.85),
                },
            ],
            DEFAULT_ANCHOR,
        )
    }

    /// Anchor for an explicit category, or `None` when the table carries no
    /// entry for it (notably [`AnchorCategory::Body`]).
    pub fn anchor_for(&self, category: AnchorCategory) -> Option<AnchorPoint> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.anchor)
    }

    /// Anchor for an untagged label, via substring classification.
    pub fn anchor_for_label(&self, label: &str) -> Option<AnchorPoint> {
        self.anchor_for(AnchorCategory::classify(label))
    }

    pub fn default_anchor(&self) -> AnchorPoint {
        self.default_anchor
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::bottle()
    }
}

// ---------------------------------------------------------------------------
// Model bounds
// ---------------------------------------------------------------------------

/// Axis-aligned extent of the reference object in model space. Backs the
/// linear vertical-axis fallback mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl ModelBounds {
    /// Validate that each axis has positive extent.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, min, max) in [
            ("x", self.min_x, self.max_x),
            ("y", self.min_y, self.max_y),
            ("z", self.min_z, self.max_z),
        ] {
            if !(max > min) {
                return Err(CoreError::Calibration(format!(
                    "model bounds degenerate on {name} axis: [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }

    /// Normalize a model-space vertical coordinate into `[0, 1]`, clamping
    /// positions outside the bounds.
    pub fn normalize_y(&self, y: f64) -> f64 {
        let t = (y - self.min_y) / (self.max_y - self.min_y);
        t.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn bottle_table_resolves_cap_anchor() {
        let table = CalibrationTable::bottle();
        let anchor = table.anchor_for(AnchorCategory::Cap).unwrap();
        assert_eq!(anchor, AnchorPoint::new(0.5, 0.15));
    }

    #[test]
    fn label_lookup_goes_through_classification() {
        let table = CalibrationTable::bottle();
        assert_eq!(
            table.anchor_for_label("Cap marker"),
            Some(AnchorPoint::new(0.5, 0.15))
        );
        assert_eq!(table.anchor_for_label("somewhere else"), None);
    }

    #[test]
    fn body_category_has_no_table_entry() {
        let table = CalibrationTable::bottle();
        assert_eq!(table.anchor_for(AnchorCategory::Body), None);
    }

    #[test]
    fn normalize_y_clamps_to_unit_interval() {
        let bounds = ModelBounds {
            min_x: -1.0,
            max_x: 1.0,
            min_y: -1.0,
            max_y: 1.0,
            min_z: -1.0,
            max_z: 1.0,
        };
        assert_eq!(bounds.normalize_y(1.0), 1.0);
        assert_eq!(bounds.normalize_y(-1.0), 0.0);
        assert_eq!(bounds.normalize_y(0.0), 0.5);
        assert_eq!(bounds.normalize_y(5.0), 1.0);
        assert_eq!(bounds.normalize_y(-5.0), 0.0);
    }

    #[test]
    fn degenerate_bounds_fail_validation() {
        let bounds = ModelBounds {
            min_x: 0.0,
            max_x: 0.0,
            min_y: -1.0,
            max_y: 1.0,
            min_z: -1.0,
            max_z: 1.0,
        };
        assert_matches!(bounds.validate(), Err(CoreError::Calibration(_)));
    }
}
