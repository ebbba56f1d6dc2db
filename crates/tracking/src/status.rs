//! Tracking status state machine.
//!
//! Derives the operator-facing [`TrackingStatus`] from the detection
//! pipeline's per-cycle outcomes. Transitions are applied once per cycle,
//! unconditionally -- there is deliberately no hysteresis or debounce, so a
//! single empty cycle flips a lock back to searching. The machine has no
//! terminal state; it runs for the lifetime of the session.

use overmark_core::{DetectionBox, TrackingStatus};

/// What a single detection cycle produced.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A usable box was found this cycle.
    Found(DetectionBox),
    /// The cycle completed but found nothing.
    Empty,
    /// The detection attempt itself failed (inference error, network
    /// failure). Distinguished from `Empty` only here, not at the
    /// pipeline's box output.
    Failed,
}

/// Per-session status machine, mutated only by the detection loop.
#[derive(Debug, Default)]
pub struct TrackingMachine {
    status: TrackingStatus,
}

impl TrackingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    /// Apply one cycle's outcome and return the resulting status.
    pub fn apply(&mut self, outcome: &CycleOutcome) -> TrackingStatus {
        self.status = match outcome {
            CycleOutcome::Found(_) => TrackingStatus::Locked,
            CycleOutcome::Empty => TrackingStatus::Searching,
            CycleOutcome::Failed => TrackingStatus::Lost,
        };
        self.status
    }
}
