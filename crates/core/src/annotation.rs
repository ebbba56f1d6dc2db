//! Annotation types and anchor-category classification.
//!
//! An [`Annotation`] is created client-side when a user marks a point on the
//! 3D reference model. Annotations are immutable once created: removal
//! deletes them, there is no in-place edit. Every connected client holds an
//! independent copy; consistency is eventual via the sync protocol
//! ([`crate::protocol`]).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ModelPoint;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a free-form annotation label.
pub const MAX_LABEL_LENGTH: usize = 200;

// ---------------------------------------------------------------------------
// Anchor categories
// ---------------------------------------------------------------------------

/// Named sub-part of the tracked object that an annotation anchors to.
///
/// The category is attached explicitly at annotation-creation time.
/// [`AnchorCategory::classify`] is the ingestion-time heuristic for labels
/// imported without a tag: a case-insensitive substring match checked in a
/// fixed priority order, first match wins, [`AnchorCategory::Body`] when
/// nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorCategory {
    /// The cap / top of the object.
    Cap,
    /// The center of the object body.
    Middle,
    /// The base of the object.
    Bottom,
    /// No named sub-part; resolved via the default anchor or the linear
    /// vertical-axis mapping.
    #[default]
    Body,
}

/// Substring → category pairs checked by [`AnchorCategory::classify`],
/// in priority order.
const CLASSIFY_ORDER: &[(&str, AnchorCategory)] = &[
    ("cap", AnchorCategory::Cap),
    ("middle", AnchorCategory::Middle),
    ("bottom", AnchorCategory::Bottom),
];

impl AnchorCategory {
    /// Return the category as a lowercase string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cap => "cap",
            Self::Middle => "middle",
            Self::Bottom => "bottom",
            Self::Body => "body",
        }
    }

    /// Classify a free-form label into an anchor category.
    ///
    /// Case-insensitive substring match, fixed priority order, first match
    /// wins. Labels that match nothing fall back to [`Self::Body`].
    pub fn classify(label: &str) -> Self {
        let lowered = label.to_lowercase();
        for (needle, category) in CLASSIFY_ORDER {
            if lowered.contains(needle) {
                return *category;
            }
        }
        Self::Body
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// Opaque unique annotation id. Unique within a session.
pub type AnnotationId = String;

/// A single shared annotation: a labeled point in model space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Opaque token, unique within the session. May be empty on creation,
    /// in which case the store assigns one before broadcasting.
    pub id: AnnotationId,
    /// Position on the 3D reference model, in model space.
    pub position: ModelPoint,
    /// Free-form display label.
    pub label: String,
    /// Anchor category attached at creation time. Defaults to `body` when
    /// deserializing legacy payloads without a tag.
    #[serde(default)]
    pub category: AnchorCategory,
}

impl Annotation {
    /// Create an annotation with an explicit id, classifying the label into
    /// an anchor category.
    pub fn new(id: impl Into<AnnotationId>, position: ModelPoint, label: impl Into<String>) -> Self {
        let label = label.into();
        let category = AnchorCategory::classify(&label);
        Self {
            id: id.into(),
            position,
            label,
            category,
        }
    }
}

/// Validate an annotation label.
///
/// The label may be empty (markers without text are allowed) but must not
/// exceed [`MAX_LABEL_LENGTH`] characters.
pub fn validate_label(label: &str) -> Result<(), CoreError> {
    if label.chars().count() > MAX_LABEL_LENGTH {
        return Err(CoreError::Validation(format!(
            "annotation label exceeds {MAX_LABEL_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(AnchorCategory::classify("Cap marker"), AnchorCategory::Cap);
        assert_eq!(AnchorCategory::classify("BOTTOM edge"), AnchorCategory::Bottom);
        assert_eq!(AnchorCategory::classify("the middle part"), AnchorCategory::Middle);
    }

    #[test]
    fn classify_first_match_wins() {
        // "cap" is checked before "bottom".
        assert_eq!(
            AnchorCategory::classify("cap near the bottom"),
            AnchorCategory::Cap
        );
    }

    #[test]
    fn classify_unmatched_label_falls_back_to_body() {
        assert_eq!(AnchorCategory::classify("incision point"), AnchorCategory::Body);
        assert_eq!(AnchorCategory::classify(""), AnchorCategory::Body);
    }

    #[test]
    fn new_annotation_tags_category_from_label() {
        let a = Annotation::new("a1", ModelPoint::new(0.0, 1.0, 0.0), "Cap marker");
        assert_eq!(a.category, AnchorCategory::Cap);
    }

    #[test]
    fn deserialize_without_category_defaults_to_body() {
        let json = r#"{"id":"a1","position":{"x":0,"y":0,"z":0},"label":"x"}"#;
        let a: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(a.category, AnchorCategory::Body);
    }

    #[test]
    fn validate_label_rejects_oversized() {
        let long = "x".repeat(MAX_LABEL_LENGTH + 1);
        assert_matches!(validate_label(&long), Err(CoreError::Validation(_)));
        assert_matches!(validate_label("ok"), Ok(()));
    }
}
