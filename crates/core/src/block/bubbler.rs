use super::{BlockError, Context};
use crate::RotationSchedule;

/// How a [`Bubbler`] accounts for the insoluble stream it fails to convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResiduePolicy {
    /// Only the converted stream is sampled; the residue is the uncollected
    /// part of it, `(1 - η_v) × (soluble + η_c × insoluble)`.
    #[default]
    Converted,

    /// The unconverted insoluble stream `(1 - η_c) × insoluble` also leaves
    /// through the residue, so every unit entering the bubbler is accounted
    /// for in either a vial or `sample_out`.
    MassConserving,
}

/// Configuration for a [`Bubbler`].
#[derive(Debug, Clone, PartialEq)]
pub struct BubblerConfig {
    /// Fraction of the sampled stream captured by the active vial.
    pub collection_efficiency: f64,

    /// Fraction of the insoluble stream converted into a capturable form.
    pub conversion_efficiency: f64,

    /// Vial rotation times. Empty means a single vial for the whole run.
    pub replacement_times: Vec<f64>,

    pub residue: ResiduePolicy,
}

/// A gas sampler that collects activity into a rotating set of vials.
///
/// The bubbler receives a soluble and an insoluble stream. The captured
/// stream `c = soluble + η_c × insoluble` is collected with efficiency `η_v`
/// into the active vial, and the uncollected residue leaves via `sample_out`.
///
/// Each replacement time activates the next vial. Earlier vials keep the
/// value they held at the moment of rotation; the last vial stays active for
/// the rest of the run.
///
/// Ports:
///
/// - inputs: `sample_in_soluble`, `sample_in_insoluble`
/// - outputs: `sample_out`, `vial1`, …, `vialN`
#[derive(Debug, Clone, PartialEq)]
pub struct Bubbler {
    collection_efficiency: f64,
    conversion_efficiency: f64,
    residue: ResiduePolicy,
    schedule: Option<RotationSchedule>,
}

impl Bubbler {
    pub const SOLUBLE: &'static str = "sample_in_soluble";
    pub const INSOLUBLE: &'static str = "sample_in_insoluble";
    pub const SAMPLE_OUT: &'static str = "sample_out";
    pub(crate) const SAMPLE_OUT_INDEX: usize = 0;

    /// Creates a bubbler from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an efficiency lies outside `[0, 1]` or the
    /// replacement times do not form a valid [`RotationSchedule`].
    pub fn new(config: BubblerConfig) -> Result<Self, BlockError> {
        let BubblerConfig {
            collection_efficiency,
            conversion_efficiency,
            replacement_times,
            residue,
        } = config;

        check_efficiency("collection efficiency", collection_efficiency)?;
        check_efficiency("conversion efficiency", conversion_efficiency)?;

        let schedule = if replacement_times.is_empty() {
            None
        } else {
            Some(RotationSchedule::new(replacement_times)?)
        };

        Ok(Self {
            collection_efficiency,
            conversion_efficiency,
            residue,
            schedule,
        })
    }

    #[must_use]
    pub fn collection_efficiency(&self) -> f64 {
        self.collection_efficiency
    }

    #[must_use]
    pub fn conversion_efficiency(&self) -> f64 {
        self.conversion_efficiency
    }

    #[must_use]
    pub fn residue(&self) -> ResiduePolicy {
        self.residue
    }

    #[must_use]
    pub fn schedule(&self) -> Option<&RotationSchedule> {
        self.schedule.as_ref()
    }

    /// Returns the number of vials.
    #[must_use]
    pub fn vial_count(&self) -> usize {
        self.schedule
            .as_ref()
            .map_or(1, RotationSchedule::vial_count)
    }

    /// Returns the output port name of the zero-based vial `index`.
    #[must_use]
    pub fn vial_port(index: usize) -> String {
        format!("vial{}", index + 1)
    }

    /// Returns the stream available for capture.
    #[must_use]
    pub fn captured(&self, soluble: f64, insoluble: f64) -> f64 {
        soluble + self.conversion_efficiency * insoluble
    }

    /// Returns the rate at which the active vial accumulates.
    #[must_use]
    pub fn collection_rate(&self, soluble: f64, insoluble: f64) -> f64 {
        self.collection_efficiency * self.captured(soluble, insoluble)
    }

    /// Returns the uncollected residue leaving through `sample_out`.
    #[must_use]
    pub fn residue_rate(&self, soluble: f64, insoluble: f64) -> f64 {
        let uncollected = (1.0 - self.collection_efficiency) * self.captured(soluble, insoluble);
        match self.residue {
            ResiduePolicy::Converted => uncollected,
            ResiduePolicy::MassConserving => {
                uncollected + (1.0 - self.conversion_efficiency) * insoluble
            }
        }
    }

    pub(crate) fn outputs(&self) -> Vec<String> {
        std::iter::once(Self::SAMPLE_OUT.to_owned())
            .chain((0..self.vial_count()).map(Self::vial_port))
            .collect()
    }

    pub(crate) fn output(&self, ctx: &Context<'_>, out: &mut [f64]) {
        out[Self::SAMPLE_OUT_INDEX] = self.residue_rate(ctx.inputs[0], ctx.inputs[1]);
        out[1..].copy_from_slice(ctx.state);
    }

    pub(crate) fn derivative(&self, ctx: &Context<'_>, dx: &mut [f64]) {
        dx.fill(0.0);
        dx[ctx.active_vial] = self.collection_rate(ctx.inputs[0], ctx.inputs[1]);
    }
}

fn check_efficiency(parameter: &'static str, value: f64) -> Result<(), BlockError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(BlockError::Efficiency { parameter, value })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn config(residue: ResiduePolicy) -> BubblerConfig {
        BubblerConfig {
            collection_efficiency: 0.95,
            conversion_efficiency: 0.8,
            replacement_times: vec![10.0, 20.0],
            residue,
        }
    }

    #[test]
    fn only_active_vial_accumulates() {
        let bubbler = Bubbler::new(config(ResiduePolicy::Converted)).unwrap();
        let state = [4.0, 1.0, 0.0];
        let ctx = Context {
            t: 15.0,
            inputs: &[2.0, 10.0],
            state: &state,
            active_vial: 1,
        };

        let mut dx = [9.0; 3];
        bubbler.derivative(&ctx, &mut dx);

        assert_eq!(dx[0], 0.0);
        assert_relative_eq!(dx[1], 0.95 * (2.0 + 0.8 * 10.0));
        assert_eq!(dx[2], 0.0);
    }

    #[test]
    fn outputs_residue_and_vials() {
        let bubbler = Bubbler::new(config(ResiduePolicy::Converted)).unwrap();
        let state = [4.0, 1.0, 0.0];
        let ctx = Context {
            t: 15.0,
            inputs: &[2.0, 10.0],
            state: &state,
            active_vial: 1,
        };

        let mut out = [0.0; 4];
        bubbler.output(&ctx, &mut out);

        assert_relative_eq!(out[0], 0.05 * 10.0);
        assert_eq!(&out[1..], &state);
    }

    #[test]
    fn captured_plus_residue_by_policy() {
        let (soluble, insoluble) = (2.0, 10.0);

        let converted = Bubbler::new(config(ResiduePolicy::Converted)).unwrap();
        assert_relative_eq!(
            converted.collection_rate(soluble, insoluble)
                + converted.residue_rate(soluble, insoluble),
            soluble + 0.8 * insoluble
        );

        let conserving = Bubbler::new(config(ResiduePolicy::MassConserving)).unwrap();
        assert_relative_eq!(
            conserving.collection_rate(soluble, insoluble)
                + conserving.residue_rate(soluble, insoluble),
            soluble + insoluble
        );
    }

    #[test]
    fn vial_count_follows_schedule() {
        let bubbler = Bubbler::new(config(ResiduePolicy::Converted)).unwrap();
        assert_eq!(bubbler.vial_count(), 3);

        let single = Bubbler::new(BubblerConfig {
            replacement_times: vec![],
            ..config(ResiduePolicy::Converted)
        })
        .unwrap();
        assert_eq!(single.vial_count(), 1);
        assert!(single.schedule().is_none());
    }

    #[test]
    fn rejects_bad_configuration() {
        let bad_efficiency = BubblerConfig {
            collection_efficiency: 1.2,
            ..config(ResiduePolicy::Converted)
        };
        assert!(matches!(
            Bubbler::new(bad_efficiency),
            Err(BlockError::Efficiency {
                parameter: "collection efficiency",
                ..
            })
        ));

        let bad_times = BubblerConfig {
            replacement_times: vec![20.0, 10.0],
            ..config(ResiduePolicy::Converted)
        };
        assert!(matches!(
            Bubbler::new(bad_times),
            Err(BlockError::Schedule(_))
        ));
    }
}
