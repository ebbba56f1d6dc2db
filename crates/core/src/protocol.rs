//! Sync channel wire protocol.
//!
//! Annotation mutations replicate between session participants as JSON
//! messages of the shape `{"type": "<kind>", ...}` over the persistent
//! channel. This module lives in `core` so the client sync layer and the
//! relay hub share one definition.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId};
use crate::error::CoreError;

/// Distinguished id meaning "clear the whole annotation set".
///
/// Legacy behaviour, preserved deliberately: a remove carrying this id
/// clears the local replica without broadcasting anything, so the bulk
/// clear never propagates to peers.
pub const REMOVE_ALL_ID: &str = "all";

/// Envelope for annotation mutations on the sync channel.
///
/// Deserialized via the internally-tagged `"type"` field. Unknown types
/// parse to `Err`; consumers drop them without mutating state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEnvelope {
    /// A peer created an annotation; carries the full annotation.
    #[serde(rename = "annotation_added")]
    AnnotationAdded { annotation: Annotation },

    /// A peer removed a single annotation by id.
    #[serde(rename = "annotation_removed")]
    AnnotationRemoved { id: AnnotationId },
}

/// Parse a sync channel text message into a typed envelope.
///
/// Returns `Err` for malformed JSON or unknown `type` values.
pub fn parse_envelope(text: &str) -> Result<SyncEnvelope, CoreError> {
    serde_json::from_str(text).map_err(|e| CoreError::Protocol(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnchorCategory;
    use crate::types::ModelPoint;

    #[test]
    fn parse_annotation_added() {
        let json = r#"{"type":"annotation_added","annotation":{"id":"a1","position":{"x":0.1,"y":0.9,"z":0.0},"label":"Cap marker","category":"cap"}}"#;
        let msg = parse_envelope(json).unwrap();
        match msg {
            SyncEnvelope::AnnotationAdded { annotation } => {
                assert_eq!(annotation.id, "a1");
                assert_eq!(annotation.category, AnchorCategory::Cap);
            }
            other => panic!("Expected AnnotationAdded, got {other:?}"),
        }
    }

    #[test]
    fn parse_annotation_removed() {
        let json = r#"{"type":"annotation_removed","id":"a1"}"#;
        let msg = parse_envelope(json).unwrap();
        match msg {
            SyncEnvelope::AnnotationRemoved { id } => assert_eq!(id, "a1"),
            other => panic!("Expected AnnotationRemoved, got {other:?}"),
        }
    }

    #[test]
    fn serialize_round_trips_through_tag() {
        let envelope = SyncEnvelope::AnnotationAdded {
            annotation: Annotation::new("a2", ModelPoint::new(0.0, 0.0, 0.0), "bottom"),
        };
        let text = serde_json::to_string(&envelope).unwrap();
        assert!(text.contains(r#""type":"annotation_added""#));
        assert_eq!(parse_envelope(&text).unwrap(), envelope);
    }

    #[test]
    fn parse_unknown_type_returns_error() {
        assert!(parse_envelope(r#"{"type":"presence_ping","id":"x"}"#).is_err());
    }

    #[test]
    fn parse_invalid_json_returns_error() {
        assert!(parse_envelope("not json at all").is_err());
    }
}
