//! Candidate fusion: allow-list filtering and best-candidate selection.
//!
//! Each detection cycle yields at most one [`DetectionBox`]. Candidates
//! outside the configured target-category set are discarded regardless of
//! confidence; among the survivors the highest-confidence entry wins, even
//! when a discarded category scored higher.

use overmark_core::{DetectionBox, DetectionOrigin};

use crate::detector::Candidate;

/// Default target-category allow-list.
pub const DEFAULT_TARGETS: &[&str] = &["bottle", "cup", "wine glass"];

/// The set of categories the pipeline is allowed to track.
///
/// Matching is case-insensitive; the set is fixed for the session.
#[derive(Debug, Clone)]
pub struct TargetCategories(Vec<String>);

impl TargetCategories {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            categories
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
        )
    }

    pub fn contains(&self, category: &str) -> bool {
        let lowered = category.to_lowercase();
        self.0.iter().any(|c| *c == lowered)
    }
}

impl Default for TargetCategories {
    fn default() -> Self {
        Self::new(DEFAULT_TARGETS)
    }
}

/// Select the detection for this cycle.
///
/// Returns `None` when no allow-listed candidate exists or the winner's
/// geometry is degenerate.
pub fn fuse(
    candidates: &[Candidate],
    targets: &TargetCategories,
    origin: DetectionOrigin,
) -> Option<DetectionBox> {
    let best = candidates
        .iter()
        .filter(|c| targets.contains(&c.category))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))?;

    let bbox = DetectionBox {
        x: best.x,
        y: best.y,
        width: best.width,
        height: best.height,
        category: best.category.clone(),
        confidence: best.confidence,
        origin,
    };
    bbox.is_usable().then_some(bbox)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
