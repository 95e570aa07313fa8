use tritium_core::{Event as Rotation, Snapshot};

/// Indicates how the solver terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Reached the end of the horizon.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of an SSPRK22 integration.
#[derive(Debug, Clone)]
pub struct Solution {
    /// How the solver terminated.
    pub status: Status,

    /// Snapshots after each accepted step, including the initial state.
    pub history: Vec<Snapshot>,

    /// Number of accepted steps.
    pub steps: usize,

    /// Number of rejected step attempts.
    pub rejected: usize,

    /// Vial rotations applied, in order.
    pub rotations: Vec<Rotation>,
}

impl Solution {
    /// Returns the last recorded snapshot.
    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.history.last()
    }
}
