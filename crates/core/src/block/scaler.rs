use super::{BlockError, check_finite};

/// Multiplies its input by a constant gain.
///
/// A negative gain inverts the sign of a flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    gain: f64,
}

impl Scaler {
    pub const INPUT: &'static str = "in";
    pub const OUTPUT: &'static str = "out";

    /// Creates a scaler with the given gain.
    ///
    /// # Errors
    ///
    /// Returns an error if `gain` is not finite.
    pub fn new(gain: f64) -> Result<Self, BlockError> {
        check_finite("gain", gain)?;
        Ok(Self { gain })
    }

    #[must_use]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[must_use]
    pub fn apply(&self, input: f64) -> f64 {
        self.gain * input
    }
}
