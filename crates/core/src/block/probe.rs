use std::collections::HashSet;

use super::BlockError;

/// A labeled sink.
///
/// A probe has one input per label and no outputs. Its inputs are exposed as
/// diagnostic channels by [`Network::channels`](crate::Network::channels).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    labels: Vec<String>,
}

impl Probe {
    /// Creates a probe with one input per label.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no labels or a label repeats.
    pub fn new<I, S>(labels: I) -> Result<Self, BlockError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(BlockError::NoPorts);
        }

        let mut seen = HashSet::new();
        if let Some(label) = labels.iter().find(|label| !seen.insert(label.as_str())) {
            return Err(BlockError::DuplicatePort(label.clone()));
        }

        Ok(Self { labels })
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
