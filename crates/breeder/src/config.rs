//! TOML configuration for BABY runs.

pub(crate) mod quantity;
pub(crate) mod residue;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tritium_core::{ConfigError, Network, SettingsError, SolverSettings};
use uom::si::{
    f64::Time,
    time::{day, second},
};

use crate::{BreederParameters, DerivedParameters, ParameterError, Sampling, build_network};

/// A complete description of a BABY run.
///
/// Every table and field is optional; missing values take the BABY defaults.
///
/// ```toml
/// [parameters]
/// volume = "100 cm³"
/// irradiation_time = "12 h"
///
/// [sampling]
/// residue = "mass_conserving"
/// iv_replacement_times = ["0.5 d", "1 d"]
///
/// [solver]
/// dt_max = 300.0
///
/// [run]
/// horizon = "8 d"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreederConfig {
    pub parameters: BreederParameters,
    pub sampling: Sampling,
    pub solver: SolverConfig,
    pub run: RunConfig,
}

/// Solver settings in seconds, as written in a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub dt: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub max_iterations: usize,
    pub fixed_point_tolerance: f64,
    pub lte_rel: f64,
    pub lte_abs: f64,
    pub mass_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dt: 100.0,
            dt_min: 1e-6,
            // Error control and exact landing on rotations bound the accuracy.
            // Final vial values stay within 1e-5 relative of a 10 s cap at
            // about a twentieth of the steps.
            dt_max: 600.0,
            max_iterations: 100,
            fixed_point_tolerance: 1e-6,
            lte_rel: 1e-4,
            lte_abs: 1e-9,
            mass_tolerance: 1e-9,
        }
    }
}

impl SolverConfig {
    /// Validates the values as [`SolverSettings`].
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] for the first invalid group of values.
    pub fn settings(&self) -> Result<SolverSettings, SettingsError> {
        SolverSettings::new(self.dt, self.dt_min, self.dt_max)?
            .with_fixed_point(self.max_iterations, self.fixed_point_tolerance)?
            .with_lte(self.lte_rel, self.lte_abs)?
            .with_mass_tolerance(self.mass_tolerance)
    }
}

/// Run length.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    #[serde(deserialize_with = "quantity::deserialize")]
    pub horizon: Time,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            horizon: Time::new::<day>(8.0),
        }
    }
}

/// Errors that can occur when loading a [`BreederConfig`].
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid parameters: {0}")]
    Parameters(#[from] ParameterError),

    #[error("invalid solver settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("horizon must be finite and positive, got {0} s")]
    Horizon(f64),

    #[error("invalid network: {0}")]
    Network(#[from] ConfigError),
}

impl BreederConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema, or if
    /// the parameters, solver settings, or horizon are invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(text)?;
        config.derived()?;
        config.settings()?;
        config.checked_horizon()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are
    /// invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded breeder configuration");
        Ok(config)
    }

    /// Derives the scalar model parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ParameterError`] naming the first invalid field.
    pub fn derived(&self) -> Result<DerivedParameters, ParameterError> {
        self.parameters.derive()
    }

    /// Returns the validated solver settings.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] for the first invalid group of values.
    pub fn settings(&self) -> Result<SolverSettings, SettingsError> {
        self.solver.settings()
    }

    /// Returns the run length in seconds.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.run.horizon.get::<second>()
    }

    /// Assembles the configured BABY network.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the configuration is invalid.
    pub fn network(&self) -> Result<Network, ConfigFileError> {
        let derived = self.derived()?;
        let settings = self.settings()?;
        Ok(build_network(&derived, &self.sampling, settings)?)
    }

    fn checked_horizon(&self) -> Result<f64, ConfigFileError> {
        let horizon = self.horizon();
        if horizon.is_finite() && horizon > 0.0 {
            Ok(horizon)
        } else {
            Err(ConfigFileError::Horizon(horizon))
        }
    }
}
