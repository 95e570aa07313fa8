use std::collections::HashSet;

use super::{BlockError, FRACTION_SUM_TOLERANCE};

/// Divides one flow into named branches by fixed fractions.
///
/// Fractions lie within `[0, 1]` and sum to one within
/// [`FRACTION_SUM_TOLERANCE`], so the branch outputs always add up to the
/// input.
///
/// # Examples
///
/// ```
/// use tritium_core::Splitter;
///
/// let split = Splitter::new([("soluble", 0.01), ("insoluble", 0.99)]).unwrap();
/// assert_eq!(split.fractions(), [0.01, 0.99]);
///
/// assert!(Splitter::new([("a", 0.5), ("b", 0.48)]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Splitter {
    outputs: Vec<String>,
    fractions: Vec<f64>,
}

impl Splitter {
    pub const INPUT: &'static str = "in";

    /// Creates a splitter from `(output name, fraction)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no branches, a name repeats, a fraction
    /// is outside `[0, 1]`, or the fractions do not sum to one.
    pub fn new<I, S>(branches: I) -> Result<Self, BlockError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (outputs, fractions): (Vec<String>, Vec<f64>) = branches
            .into_iter()
            .map(|(name, fraction)| (name.into(), fraction))
            .unzip();

        if outputs.is_empty() {
            return Err(BlockError::NoPorts);
        }

        let mut seen = HashSet::new();
        if let Some(name) = outputs.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(BlockError::DuplicatePort(name.clone()));
        }

        for (name, &value) in outputs.iter().zip(&fractions) {
            if !(0.0..=1.0).contains(&value) {
                return Err(BlockError::SplitFraction {
                    port: name.clone(),
                    value,
                });
            }
        }

        let sum: f64 = fractions.iter().sum();
        if (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
            return Err(BlockError::SplitSum { sum });
        }

        Ok(Self { outputs, fractions })
    }

    /// Creates a two-way splitter with fractions `f` and `1 - f`.
    ///
    /// # Errors
    ///
    /// Returns an error if `f` is outside `[0, 1]` or the names are equal.
    pub fn two_way(
        first: impl Into<String>,
        second: impl Into<String>,
        f: f64,
    ) -> Result<Self, BlockError> {
        Self::new([(first.into(), f), (second.into(), 1.0 - f)])
    }

    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    #[must_use]
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    pub(crate) fn split(&self, input: f64, out: &mut [f64]) {
        for (slot, fraction) in out.iter_mut().zip(&self.fractions) {
            *slot = fraction * input;
        }
    }
}
