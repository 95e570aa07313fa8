//! Network fixtures shared by the integration tests.

use thiserror::Error;
use tritium_core::{
    Bubbler, BubblerConfig, ConfigError, Integrator, Network, NetworkBuilder, Process,
    ResiduePolicy, SettingsError, SolverSettings, Source, Splitter,
};

/// Tight tolerances so numerical error stays well below test tolerances.
///
/// # Errors
///
/// Returns an error if `dt_max` is not a valid step size.
pub fn tight_settings(dt_max: f64) -> Result<SolverSettings, SettingsError> {
    SolverSettings::new(dt_max.min(0.1), 1e-9, dt_max)?.with_lte(1e-6, 1e-10)
}

/// Errors from building a fixture network.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("invalid network: {0}")]
    Network(#[from] ConfigError),
}

/// Parameters of [`sampler`].
#[derive(Debug, Clone)]
pub struct SamplerSetup {
    /// Feed rate into the upstream compartment.
    pub feed: f64,

    /// Residence time of the upstream compartment.
    pub residence_time: f64,

    /// Soluble share of the compartment outflow.
    pub soluble_fraction: f64,

    pub bubbler: BubblerConfig,

    /// Largest step, passed to [`tight_settings`].
    pub dt_max: f64,
}

impl Default for SamplerSetup {
    fn default() -> Self {
        Self {
            feed: 4.0,
            residence_time: 2.0,
            soluble_fraction: 0.3,
            bubbler: BubblerConfig {
                collection_efficiency: 0.9,
                conversion_efficiency: 0.6,
                replacement_times: vec![3.0, 6.0],
                residue: ResiduePolicy::Converted,
            },
            dt_max: 0.25,
        }
    }
}

/// A feed into a compartment whose outflow is split into soluble and
/// insoluble streams and sampled by a bubbler.
///
/// Integrators record both sampled streams (`soluble_total`,
/// `insoluble_total`) and the bubbler residue (`residue_total`).
///
/// # Errors
///
/// Returns an error if the setup holds an invalid step size or invalid
/// block parameters.
pub fn sampler(setup: &SamplerSetup) -> Result<Network, FixtureError> {
    let mut builder = NetworkBuilder::new();
    builder.settings(tight_settings(setup.dt_max)?);

    builder
        .try_add("feed", Source::step(setup.feed, 0.0))?
        .try_add("tank", Process::new(setup.residence_time))?
        .try_add(
            "split",
            Splitter::two_way("soluble", "insoluble", setup.soluble_fraction),
        )?
        .try_add("bubbler", Bubbler::new(setup.bubbler.clone()))?
        .add("soluble_total", Integrator::new())?
        .add("insoluble_total", Integrator::new())?
        .add("residue_total", Integrator::new())?;

    builder
        .connect(("feed", "out"), ("tank", "inflow"))
        .connect(("tank", "mass_flow_rate"), ("split", "in"))
        .connect(("split", "soluble"), ("bubbler", "sample_in_soluble"))
        .connect(("split", "insoluble"), ("bubbler", "sample_in_insoluble"))
        .connect(("split", "soluble"), ("soluble_total", "in"))
        .connect(("split", "insoluble"), ("insoluble_total", "in"))
        .connect(("bubbler", "sample_out"), ("residue_total", "in"));

    Ok(builder.build()?)
}
