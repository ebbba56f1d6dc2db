//! Coordinate resolver: model-space annotations → pixel positions.
//!
//! Two mapping modes coexist:
//!
//! * **Categorical** -- a static per-category anchor inside the detection
//!   box, precise for the fixed reference geometry.
//! * **Linear** -- a continuous mapping of the annotation's model-space
//!   vertical coordinate onto the box's vertical extent, for arbitrary
//!   positions without a named category.
//!
//! Both return `None` whenever the box is absent or degenerate, so an
//! overlay with no usable detection renders no markers at all.

use crate::annotation::{AnchorCategory, Annotation};
use crate::calibration::{AnchorPoint, CalibrationTable, ModelBounds};
use crate::detection::DetectionBox;
use crate::types::PixelPoint;

/// Resolve an annotation against the current box using the calibration
/// table.
///
/// Anchor selection: explicit category tag first; for untagged (`Body`)
/// annotations, substring classification of the label; the table's default
/// anchor when neither yields an entry.
pub fn resolve(
    annotation: &Annotation,
    current: Option<&DetectionBox>,
    table: &CalibrationTable,
) -> Option<PixelPoint> {
    let bbox = usable(current)?;
    let anchor = anchor_for(annotation, table);
    Some(project(bbox, anchor))
}

/// Resolve via the linear vertical-axis fallback.
///
/// The annotation's model-space `y` is normalized into `[0, 1]` using the
/// model bounds, then inverted before scaling into the box: model "up"
/// corresponds to pixel "up", which is numerically decreasing `y`.
/// Horizontally the marker sits at the box center.
pub fn resolve_linear(
    annotation: &Annotation,
    current: Option<&DetectionBox>,
    bounds: &ModelBounds,
) -> Option<PixelPoint> {
    let bbox = usable(current)?;
    let t = bounds.normalize_y(annotation.position.y);
    Some(PixelPoint::new(
        bbox.x + 0.5 * bbox.width,
        bbox.y + (1.0 - t) * bbox.height,
    ))
}

/// Resolve with automatic mode selection: categorical when the annotation
/// carries (or its label classifies to) a calibrated category, linear
/// otherwise.
pub fn resolve_auto(
    annotation: &Annotation,
    current: Option<&DetectionBox>,
    table: &CalibrationTable,
    bounds: &ModelBounds,
) -> Option<PixelPoint> {
    let bbox = usable(current)?;
    match calibrated_anchor(annotation, table) {
        Some(anchor) => Some(project(bbox, anchor)),
        None => resolve_linear(annotation, current, bounds),
    }
}

/// Filter out absent and degenerate boxes in one place.
fn usable(current: Option<&DetectionBox>) -> Option<&DetectionBox> {
    current.filter(|b| b.is_usable())
}

/// Anchor from the table, or `None` when the annotation has no calibrated
/// category.
fn calibrated_anchor(annotation: &Annotation, table: &CalibrationTable) -> Option<AnchorPoint> {
    match annotation.category {
        AnchorCategory::Body => table.anchor_for_label(&annotation.label),
        tagged => table
            .anchor_for(tagged)
            .or_else(|| table.anchor_for_label(&annotation.label)),
    }
}

fn anchor_for(annotation: &Annotation, table: &CalibrationTable) -> AnchorPoint {
    calibrated_anchor(annotation, table).unwrap_or_else(|| table.default_anchor())
}

fn project(bbox: &DetectionBox, anchor: AnchorPoint) -> PixelPoint {
    PixelPoint::new(
        bbox.x + anchor.x_fraction * bbox.width,
        bbox.y + anchor.y_fraction * bbox.height,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
