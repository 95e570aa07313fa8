use serde::Deserialize;
use thiserror::Error;
use uom::si::{
    area::square_meter,
    f64::{Area, Frequency, Ratio, Time, Velocity, Volume, VolumeRate},
    frequency::hertz,
    ratio::ratio,
    time::{hour, second},
    velocity::meter_per_second,
    volume::cubic_centimeter,
};

use crate::config::quantity;

/// Physical inputs of the breeder model.
///
/// Defaults describe the 100 mL BABY experiment. Deserializes from unit-bearing
/// strings such as `"12 h"` or `"4.9e-8 m/s"`; missing fields keep their
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreederParameters {
    /// Outer wall area, the outboard (OV) release surface.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub wall_area: Area,

    /// Free surface area at the top, the inboard (IV) release surface.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub top_area: Area,

    /// Breeder salt volume.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub volume: Volume,

    #[serde(deserialize_with = "quantity::deserialize")]
    pub wall_mass_transfer: Velocity,

    #[serde(deserialize_with = "quantity::deserialize")]
    pub top_mass_transfer: Velocity,

    /// Neutron emission rate of the generator.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub neutron_rate: Frequency,

    /// Length of the irradiation, starting at `t = 0`.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub irradiation_time: Time,

    /// Tritium atoms bred per source neutron.
    pub tbr: f64,

    /// Inboard gas volume relative to the breeder, in units of the IV
    /// release time constant.
    pub iv_gas_factor: f64,

    /// Outboard counterpart of `iv_gas_factor`.
    pub ov_gas_factor: f64,
}

impl Default for BreederParameters {
    fn default() -> Self {
        Self {
            wall_area: Area::new::<square_meter>(0.0123),
            top_area: Area::new::<square_meter>(0.0021),
            volume: Volume::new::<cubic_centimeter>(100.0),
            wall_mass_transfer: Velocity::new::<meter_per_second>(1.9e-8),
            top_mass_transfer: Velocity::new::<meter_per_second>(4.9e-8),
            neutron_rate: Frequency::new::<hertz>(1.2e8),
            irradiation_time: Time::new::<hour>(12.0),
            tbr: 4.7e-4,
            iv_gas_factor: 0.1,
            ov_gas_factor: 2.2,
        }
    }
}

/// Scalar model parameters in SI units, derived from [`BreederParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedParameters {
    /// Breeder residence time `V / (k_IV A_IV + k_OV A_OV)`, in seconds.
    pub baby_residence_time: f64,

    /// Inboard gas residence time `f_IV V / (k_IV A_IV)`, in seconds.
    pub iv_gas_residence_time: f64,

    /// Outboard gas residence time `f_OV V / (k_OV A_OV)`, in seconds.
    pub ov_gas_residence_time: f64,

    /// Share of the breeder release leaving through the top surface.
    pub iv_fraction: f64,

    /// Share of the breeder release leaving through the walls.
    pub ov_fraction: f64,

    /// Neutrons per second while the generator is on.
    pub neutron_rate: f64,

    pub tbr: f64,

    /// Tritium atoms bred per second while the generator is on.
    pub production_rate: f64,

    /// Irradiation length, in seconds.
    pub irradiation_time: f64,
}

/// Errors that can occur when deriving model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParameterError {
    #[error("{field} must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}

impl BreederParameters {
    /// Derives the scalar model parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ParameterError`] naming the first field that is not finite
    /// and positive. The breeding ratio may be zero.
    pub fn derive(&self) -> Result<DerivedParameters, ParameterError> {
        positive("wall_area", self.wall_area.value)?;
        positive("top_area", self.top_area.value)?;
        positive("volume", self.volume.value)?;
        positive("wall_mass_transfer", self.wall_mass_transfer.value)?;
        positive("top_mass_transfer", self.top_mass_transfer.value)?;
        positive("neutron_rate", self.neutron_rate.value)?;
        positive("irradiation_time", self.irradiation_time.value)?;
        positive("iv_gas_factor", self.iv_gas_factor)?;
        positive("ov_gas_factor", self.ov_gas_factor)?;
        if !self.tbr.is_finite() || self.tbr < 0.0 {
            return Err(ParameterError::Negative {
                field: "tbr",
                value: self.tbr,
            });
        }

        let iv: VolumeRate = self.top_mass_transfer * self.top_area;
        let ov: VolumeRate = self.wall_mass_transfer * self.wall_area;

        let baby_residence_time: Time = self.volume / (iv + ov);
        let iv_gas_residence_time: Time = self.volume * self.iv_gas_factor / iv;
        let ov_gas_residence_time: Time = self.volume * self.ov_gas_factor / ov;
        let iv_fraction: Ratio = iv / (iv + ov);
        let iv_fraction = iv_fraction.get::<ratio>();

        let neutron_rate = self.neutron_rate.get::<hertz>();

        Ok(DerivedParameters {
            baby_residence_time: baby_residence_time.get::<second>(),
            iv_gas_residence_time: iv_gas_residence_time.get::<second>(),
            ov_gas_residence_time: ov_gas_residence_time.get::<second>(),
            iv_fraction,
            ov_fraction: 1.0 - iv_fraction,
            neutron_rate,
            tbr: self.tbr,
            production_rate: self.tbr * neutron_rate,
            irradiation_time: self.irradiation_time.get::<second>(),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NotPositive { field, value })
    }
}
