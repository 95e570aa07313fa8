use super::{BlockError, check_finite};

/// Accumulates the time integral of its input from the start of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Integrator {
    initial: f64,
}

impl Integrator {
    pub const INPUT: &'static str = "in";
    pub const OUTPUT: &'static str = "out";

    /// Creates an integrator starting from zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an integrator starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns an error if `initial` is not finite.
    pub fn with_initial(initial: f64) -> Result<Self, BlockError> {
        check_finite("initial value", initial)?;
        Ok(Self { initial })
    }

    #[must_use]
    pub fn initial_value(&self) -> f64 {
        self.initial
    }
}
