//! Client-local annotation replica.
//!
//! The store is an ordered sequence of annotations (insertion order is
//! display order, ids unique within the session). Local mutations return
//! the envelope to broadcast; applying a remote envelope mutates state the
//! same way but produces nothing outbound, so messages never echo back to
//! the channel.

use overmark_core::{Annotation, AnnotationId, SyncEnvelope, REMOVE_ALL_ID};

/// Ordered annotation replica for one client.
#[derive(Debug)]
pub struct AnnotationStore {
    client_id: String,
    annotations: Vec<Annotation>,
    /// Monotonic per-client counter for assigned ids.
    next_seq: u64,
}

impl AnnotationStore {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            annotations: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Annotations in insertion (display) order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.annotations.iter().any(|a| a.id == id)
    }

    /// Add a local annotation (optimistic: applied before any broadcast).
    ///
    /// An empty id gets a composite `{client_id}-{counter}` id assigned;
    /// wall-clock ids are avoided because they collide under rapid
    /// concurrent creation across clients. Returns the envelope to send to
    /// peers.
    pub fn add(&mut self, mut annotation: Annotation) -> SyncEnvelope {
        if annotation.id.is_empty() {
            annotation.id = self.assign_id();
        }
        self.annotations.push(annotation.clone());
        tracing::debug!(id = %annotation.id, count = self.annotations.len(), "Annotation added");
        SyncEnvelope::AnnotationAdded { annotation }
    }

    /// Remove by id. Removing an absent id is a no-op that still reports
    /// the removal to peers (idempotent on both sides).
    ///
    /// The [`REMOVE_ALL_ID`] sentinel clears the whole sequence locally
    /// and returns `None`: the bulk clear does not propagate. This
    /// asymmetry reproduces legacy behaviour and is intentional.
    pub fn remove(&mut self, id: &str) -> Option<SyncEnvelope> {
        if id == REMOVE_ALL_ID {
            let count = self.annotations.len();
            self.annotations.clear();
            tracing::debug!(count, "Cleared all annotations (local only)");
            return None;
        }

        self.annotations.retain(|a| a.id != id);
        Some(SyncEnvelope::AnnotationRemoved {
            id: AnnotationId::from(id),
        })
    }

    /// Apply a remote envelope. Mutates exactly like the local operations
    /// but never produces an outbound message.
    pub fn apply(&mut self, envelope: SyncEnvelope) {
        match envelope {
            SyncEnvelope::AnnotationAdded { annotation } => {
                // A redelivered add must not duplicate the entry.
                if !self.contains(&annotation.id) {
                    tracing::debug!(id = %annotation.id, "Remote annotation added");
                    self.annotations.push(annotation);
                }
            }
            SyncEnvelope::AnnotationRemoved { id } => {
                self.annotations.retain(|a| a.id != id);
                tracing::debug!(id = %id, "Remote annotation removed");
            }
        }
    }

    fn assign_id(&mut self) -> AnnotationId {
        let id = format!("{}-{}", self.client_id, self.next_seq);
        self.next_seq += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use overmark_core::ModelPoint;

    fn annotation(id: &str, label: &str) -> Annotation {
        Annotation::new(id, ModelPoint::new(0.0, 0.0, 0.0), label)
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut store = AnnotationStore::new("c1");
        store.add(annotation("a", "first"));
        store.add(annotation("b", "second"));
        let ids: Vec<_> = store.annotations().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn add_assigns_composite_id_when_missing() {
        let mut store = AnnotationStore::new("c1");
        let e1 = store.add(annotation("", "x"));
        let e2 = store.add(annotation("", "y"));
        assert_matches!(e1, SyncEnvelope::AnnotationAdded { annotation } if annotation.id == "c1-0");
        assert_matches!(e2, SyncEnvelope::AnnotationAdded { annotation } if annotation.id == "c1-1");
    }

    #[test]
    fn add_keeps_caller_supplied_id() {
        let mut store = AnnotationStore::new("c1");
        let envelope = store.add(annotation("custom", "x"));
        assert_matches!(envelope, SyncEnvelope::AnnotationAdded { annotation } if annotation.id == "custom");
    }

    #[test]
    fn remove_returns_broadcast_envelope() {
        let mut store = AnnotationStore::new("c1");
        store.add(annotation("a", "x"));
        let envelope = store.remove("a");
        assert_matches!(envelope, Some(SyncEnvelope::AnnotationRemoved { id }) if id == "a");
        assert!(store.is_empty());
    }

    #[test]
    fn remove_all_sentinel_clears_without_broadcasting() {
        let mut store = AnnotationStore::new("c1");
        store.add(annotation("a", "x"));
        store.add(annotation("b", "y"));
        assert_eq!(store.remove(REMOVE_ALL_ID), None);
        assert!(store.is_empty());
    }

    #[test]
    fn remote_remove_is_idempotent() {
        let mut store = AnnotationStore::new("c1");
        store.add(annotation("a1", "x"));

        let removal = SyncEnvelope::AnnotationRemoved { id: "a1".into() };
        store.apply(removal.clone());
        assert!(!store.contains("a1"));
        // Applying it again must be harmless.
        store.apply(removal);
        assert!(!store.contains("a1"));
    }

    #[test]
    fn remote_add_does_not_duplicate() {
        let mut store = AnnotationStore::new("c1");
        let added = SyncEnvelope::AnnotationAdded {
            annotation: annotation("a1", "x"),
        };
        store.apply(added.clone());
        store.apply(added);
        assert_eq!(store.len(), 1);
    }
}
