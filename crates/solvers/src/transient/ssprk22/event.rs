use tritium_core::Snapshot;

/// Event emitted by the SSPRK22 solver.
#[derive(Debug, Clone)]
pub enum Event {
    /// A step was accepted.
    ///
    /// Step 0 is the initial state before any integration.
    Step {
        step: usize,

        /// The size of the accepted step, zero for step 0.
        dt: f64,

        snapshot: Snapshot,
    },

    /// A vial rotation was applied.
    Rotation {
        rotation: tritium_core::Event,

        /// State immediately after the rotation.
        snapshot: Snapshot,
    },
}

impl Event {
    /// Returns the snapshot carried by the event.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Step { snapshot, .. } | Self::Rotation { snapshot, .. } => snapshot,
        }
    }
}
