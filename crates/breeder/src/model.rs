//! The BABY reference network.
//!
//! Tritium bred in the salt (`baby`) is released through the top surface into
//! the inboard gas (`iv_gas`) and through the walls into the outboard gas
//! (`ov_gas`). Each gas stream is counted as cumulative release and sampled by
//! a bubbler whose residue goes to the environment.
//!
//! ```text
//! neutron_on ───────────────┐
//! neutron_off ─► invert ─► neutron_rate ─► tbr ─► baby ─► iv_vs_ov
//!                                                            │
//!           ┌───────────────────────── iv ───────────────────┤
//!           ▼                                                 ▼ ov
//!        iv_gas ─► iv_release                              ov_gas ─► ov_release
//!           │                                                 │
//!   iv_soluble_split ─► iv_bubbler ─┐     ┌─ ov_bubbler ◄─ ov_soluble_split
//!                                   ▼     ▼
//!                                 environment ─► environment_release
//! ```
//!
//! Probes: `neutron_source`, `baby_inventory`, `iv_vials`, `ov_vials`,
//! `cumulative_release`.

use serde::Deserialize;
use tracing::debug;
use tritium_core::{
    Bubbler, BubblerConfig, Combiner, ConfigError, Integrator, Network, NetworkBuilder, Probe,
    Process, ResiduePolicy, Scaler, SolverSettings, Source, Splitter,
};
use uom::si::{
    f64::Time,
    time::{day, second},
};

use crate::{
    DerivedParameters,
    config::{quantity, residue},
};

/// Bubbler configuration shared by the inboard and outboard samplers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sampling {
    pub collection_efficiency: f64,
    pub conversion_efficiency: f64,

    /// Share of each gas stream in soluble form (HTO); the rest is
    /// insoluble (HT).
    pub soluble_fraction: f64,

    #[serde(deserialize_with = "residue::deserialize")]
    pub residue: ResiduePolicy,

    #[serde(deserialize_with = "quantity::deserialize_vec")]
    pub iv_replacement_times: Vec<Time>,

    #[serde(deserialize_with = "quantity::deserialize_vec")]
    pub ov_replacement_times: Vec<Time>,
}

impl Default for Sampling {
    fn default() -> Self {
        let days = |list: &[f64]| list.iter().map(|&d| Time::new::<day>(d)).collect();
        Self {
            collection_efficiency: 0.95,
            conversion_efficiency: 1.0,
            soluble_fraction: 0.01,
            residue: ResiduePolicy::Converted,
            iv_replacement_times: days(&[0.4, 0.6, 1.0, 1.5, 2.5, 4.0]),
            ov_replacement_times: days(&[1.0, 2.5, 4.0]),
        }
    }
}

impl Sampling {
    fn bubbler(&self, times: &[Time]) -> BubblerConfig {
        BubblerConfig {
            collection_efficiency: self.collection_efficiency,
            conversion_efficiency: self.conversion_efficiency,
            replacement_times: times.iter().map(|t| t.get::<second>()).collect(),
            residue: self.residue,
        }
    }
}

/// Assembles the BABY network.
///
/// # Errors
///
/// Returns a [`ConfigError`] naming the block whose parameters are invalid,
/// such as a soluble fraction outside `[0, 1]` or unordered replacement times.
pub fn build_network(
    derived: &DerivedParameters,
    sampling: &Sampling,
    settings: SolverSettings,
) -> Result<Network, ConfigError> {
    let mut builder = NetworkBuilder::new();
    builder.settings(settings);

    // Neutron generator: on at 0, off at the end of the irradiation.
    builder
        .try_add("neutron_on", Source::step(derived.neutron_rate, 0.0))?
        .try_add(
            "neutron_off",
            Source::step(derived.neutron_rate, derived.irradiation_time),
        )?
        .try_add("invert", Scaler::new(-1.0))?
        .try_add("neutron_rate", Combiner::new(2))?
        .try_add("tbr", Scaler::new(derived.tbr))?;

    builder
        .try_add("baby", Process::new(derived.baby_residence_time))?
        .try_add(
            "iv_vs_ov",
            Splitter::new([("iv", derived.iv_fraction), ("ov", derived.ov_fraction)]),
        )?;

    let soluble = sampling.soluble_fraction;
    for (side, residence_time, times) in [
        (
            "iv",
            derived.iv_gas_residence_time,
            &sampling.iv_replacement_times,
        ),
        (
            "ov",
            derived.ov_gas_residence_time,
            &sampling.ov_replacement_times,
        ),
    ] {
        let gas = format!("{side}_gas");
        let split = format!("{side}_soluble_split");
        let bubbler = format!("{side}_bubbler");
        let release = format!("{side}_release");

        builder
            .try_add(&gas, Process::new(residence_time))?
            .add(&release, Integrator::new())?
            .try_add(
                &split,
                Splitter::two_way("soluble", "insoluble", soluble),
            )?
            .try_add(&bubbler, Bubbler::new(sampling.bubbler(times)))?;

        builder
            .connect(("iv_vs_ov", side), (gas.as_str(), Process::INFLOW))
            .connect((gas.as_str(), Process::MASS_FLOW_RATE), (release.as_str(), Integrator::INPUT))
            .connect((gas.as_str(), Process::MASS_FLOW_RATE), (split.as_str(), Splitter::INPUT))
            .connect((split.as_str(), "soluble"), (bubbler.as_str(), Bubbler::SOLUBLE))
            .connect((split.as_str(), "insoluble"), (bubbler.as_str(), Bubbler::INSOLUBLE));

        let vials = times.len() + 1;
        let labels: Vec<String> = (0..vials).map(Bubbler::vial_port).collect();
        let probe = format!("{side}_vials");
        builder.try_add(&probe, Probe::new(labels.iter().cloned()))?;
        for label in &labels {
            builder.connect((bubbler.as_str(), label.as_str()), (probe.as_str(), label.as_str()));
        }
    }

    builder
        .try_add("environment", Combiner::new(2))?
        .add("environment_release", Integrator::new())?
        .try_add("neutron_source", Probe::new(["neutron rate"]))?
        .try_add("baby_inventory", Probe::new(["inventory"]))?
        .try_add("cumulative_release", Probe::new(["IV", "OV"]))?;

    builder
        .connect(("neutron_off", Source::OUTPUT), ("invert", Scaler::INPUT))
        .connect(("invert", Scaler::OUTPUT), ("neutron_rate", 0_usize))
        .connect(("neutron_on", Source::OUTPUT), ("neutron_rate", 1_usize))
        .connect(("neutron_rate", Combiner::OUTPUT), ("tbr", Scaler::INPUT))
        .connect(("tbr", Scaler::OUTPUT), ("baby", Process::INFLOW))
        .connect(("baby", Process::MASS_FLOW_RATE), ("iv_vs_ov", Splitter::INPUT))
        .connect(("iv_bubbler", Bubbler::SAMPLE_OUT), ("environment", 0_usize))
        .connect(("ov_bubbler", Bubbler::SAMPLE_OUT), ("environment", 1_usize))
        .connect(("environment", Combiner::OUTPUT), ("environment_release", Integrator::INPUT))
        .connect(("neutron_rate", Combiner::OUTPUT), ("neutron_source", "neutron rate"))
        .connect(("baby", Process::INVENTORY), ("baby_inventory", "inventory"))
        .connect(("iv_release", Integrator::OUTPUT), ("cumulative_release", "IV"))
        .connect(("ov_release", Integrator::OUTPUT), ("cumulative_release", "OV"));

    debug!(
        baby_residence_time = derived.baby_residence_time,
        iv_gas_residence_time = derived.iv_gas_residence_time,
        ov_gas_residence_time = derived.ov_gas_residence_time,
        iv_fraction = derived.iv_fraction,
        production_rate = derived.production_rate,
        "building BABY network"
    );

    builder.build()
}
