use tritium_core::{RunError, Snapshot};

/// Errors that can occur during SSPRK22 integration.
///
/// Errors raised after the run has started carry the last valid snapshot.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("horizon must be finite and positive, got {0}")]
    Horizon(f64),

    #[error("network error: {source}")]
    Network {
        #[source]
        source: RunError,
        last: Box<Snapshot>,
    },

    #[error("error tolerance not met at t = {time} with the minimum step {dt}")]
    ToleranceUnsatisfiable {
        time: f64,
        dt: f64,
        last: Box<Snapshot>,
    },
}

impl Error {
    pub(crate) fn network(source: RunError, last: &Snapshot) -> Self {
        Self::Network {
            source,
            last: Box::new(last.clone()),
        }
    }

    /// Returns the last valid snapshot before the failure, if the run started.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Horizon(_) => None,
            Self::Network { last, .. } | Self::ToleranceUnsatisfiable { last, .. } => Some(last),
        }
    }
}
