use super::{BlockError, check_finite};

/// A time-windowed constant source.
///
/// Emits `amplitude` for times in `[start, end)` and zero elsewhere.
/// An open `end` keeps the source active for the rest of the run.
///
/// # Examples
///
/// ```
/// use tritium_core::Source;
///
/// let pulse = Source::new(5.0, 10.0, Some(20.0)).unwrap();
/// assert_eq!(pulse.value(9.9), 0.0);
/// assert_eq!(pulse.value(10.0), 5.0);
/// assert_eq!(pulse.value(20.0), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    amplitude: f64,
    start: f64,
    end: Option<f64>,
}

impl Source {
    pub const OUTPUT: &'static str = "out";

    /// Creates a source active over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is not finite or `end <= start`.
    pub fn new(amplitude: f64, start: f64, end: Option<f64>) -> Result<Self, BlockError> {
        check_finite("amplitude", amplitude)?;
        check_finite("start", start)?;
        if let Some(end) = end {
            check_finite("end", end)?;
            if end <= start {
                return Err(BlockError::Window { start, end });
            }
        }

        Ok(Self {
            amplitude,
            start,
            end,
        })
    }

    /// Creates a step source that switches on at `at` and stays on.
    ///
    /// # Errors
    ///
    /// Returns an error if `amplitude` or `at` is not finite.
    pub fn step(amplitude: f64, at: f64) -> Result<Self, BlockError> {
        Self::new(amplitude, at, None)
    }

    /// Returns the output at time `t`.
    #[must_use]
    pub fn value(&self, t: f64) -> f64 {
        let active = t >= self.start && self.end.is_none_or(|end| t < end);
        if active { self.amplitude } else { 0.0 }
    }

    /// Returns the window edges, where the output jumps.
    #[must_use]
    pub fn breakpoints(&self) -> Vec<f64> {
        std::iter::once(self.start).chain(self.end).collect()
    }
}
