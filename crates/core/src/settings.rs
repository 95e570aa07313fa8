use thiserror::Error;

/// Integration and evaluation settings for a [`Network`](crate::Network).
///
/// The step sizes and local truncation error tolerances are consumed by the
/// integration driver. The fixed-point settings and mass tolerance are used by
/// the network itself when resolving port values and checking conservation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    dt: f64,
    dt_min: f64,
    dt_max: f64,
    max_iterations: usize,
    fixed_point_tolerance: f64,
    lte_rel: f64,
    lte_abs: f64,
    mass_tolerance: f64,
}

/// Errors that can occur when validating [`SolverSettings`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    #[error("dt must be finite and positive")]
    Dt,

    #[error("dt_min must be finite, positive, and no greater than dt_max")]
    DtRange,

    #[error("max_iterations must be at least one")]
    MaxIterations,

    #[error("fixed_point_tolerance must be finite and positive")]
    FixedPointTolerance,

    #[error("lte_rel and lte_abs must be finite, non-negative, and not both zero")]
    Lte,

    #[error("mass_tolerance must be finite and non-negative")]
    MassTolerance,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            dt: 0.01,
            dt_min: 1e-6,
            dt_max: 1.0,
            max_iterations: 100,
            fixed_point_tolerance: 1e-6,
            lte_rel: 1e-4,
            lte_abs: 1e-9,
            mass_tolerance: 1e-9,
        }
    }
}

impl SolverSettings {
    /// Creates settings with validated step sizes and default tolerances.
    ///
    /// The initial step `dt` may lie outside `[dt_min, dt_max]`; drivers clamp
    /// it before the first step.
    ///
    /// # Errors
    ///
    /// Returns an error if any step size is non-finite or non-positive, or if
    /// `dt_min` exceeds `dt_max`.
    pub fn new(dt: f64, dt_min: f64, dt_max: f64) -> Result<Self, SettingsError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SettingsError::Dt);
        }
        if !dt_min.is_finite() || !dt_max.is_finite() || dt_min <= 0.0 || dt_min > dt_max {
            return Err(SettingsError::DtRange);
        }

        Ok(Self {
            dt,
            dt_min,
            dt_max,
            ..Self::default()
        })
    }

    /// Sets the fixed-point iteration cap and convergence tolerance.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iterations` is zero or `tolerance` is not
    /// finite and positive.
    pub fn with_fixed_point(
        self,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<Self, SettingsError> {
        if max_iterations == 0 {
            return Err(SettingsError::MaxIterations);
        }
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(SettingsError::FixedPointTolerance);
        }

        Ok(Self {
            max_iterations,
            fixed_point_tolerance: tolerance,
            ..self
        })
    }

    /// Sets the relative and absolute local truncation error tolerances.
    ///
    /// # Errors
    ///
    /// Returns an error if either tolerance is negative or non-finite, or if
    /// both are zero.
    pub fn with_lte(self, rel: f64, abs: f64) -> Result<Self, SettingsError> {
        let valid = |tol: f64| tol.is_finite() && tol >= 0.0;
        if !valid(rel) || !valid(abs) || (rel == 0.0 && abs == 0.0) {
            return Err(SettingsError::Lte);
        }

        Ok(Self {
            lte_rel: rel,
            lte_abs: abs,
            ..self
        })
    }

    /// Sets how far below zero a compartment mass may drift before the state
    /// is rejected as non-conservative.
    ///
    /// # Errors
    ///
    /// Returns an error if `tolerance` is negative or non-finite.
    pub fn with_mass_tolerance(self, tolerance: f64) -> Result<Self, SettingsError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SettingsError::MassTolerance);
        }

        Ok(Self {
            mass_tolerance: tolerance,
            ..self
        })
    }

    /// Returns the initial step size.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the minimum step size.
    #[must_use]
    pub fn dt_min(&self) -> f64 {
        self.dt_min
    }

    /// Returns the maximum step size.
    #[must_use]
    pub fn dt_max(&self) -> f64 {
        self.dt_max
    }

    /// Returns the maximum number of fixed-point sweeps per evaluation.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the fixed-point convergence tolerance on port values.
    #[must_use]
    pub fn fixed_point_tolerance(&self) -> f64 {
        self.fixed_point_tolerance
    }

    /// Returns the relative local truncation error tolerance.
    #[must_use]
    pub fn lte_rel(&self) -> f64 {
        self.lte_rel
    }

    /// Returns the absolute local truncation error tolerance.
    #[must_use]
    pub fn lte_abs(&self) -> f64 {
        self.lte_abs
    }

    /// Returns the tolerated negative drift of a compartment mass.
    #[must_use]
    pub fn mass_tolerance(&self) -> f64 {
        self.mass_tolerance
    }
}
