use super::BlockError;

/// A well-mixed compartment with first-order outflow.
///
/// The held mass `M` evolves as `dM/dt = inflow - M / τ`, where `τ` is the
/// residence time. The outflow `M / τ` is exposed as `mass_flow_rate` and the
/// mass itself as `inventory`.
///
/// # Examples
///
/// ```
/// use tritium_core::Process;
///
/// let baby = Process::new(100.0).unwrap();
/// assert_eq!(baby.outflow(50.0), 0.5);
/// assert_eq!(baby.rate_of_change(2.0, 50.0), 1.5);
///
/// assert!(Process::new(0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Process {
    residence_time: f64,
    initial_mass: f64,
}

impl Process {
    pub const INFLOW: &'static str = "inflow";
    pub const MASS_FLOW_RATE: &'static str = "mass_flow_rate";
    pub const INVENTORY: &'static str = "inventory";

    /// Creates an initially empty compartment.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::ResidenceTime`] unless `residence_time` is finite
    /// and strictly positive.
    pub fn new(residence_time: f64) -> Result<Self, BlockError> {
        if !residence_time.is_finite() || residence_time <= 0.0 {
            return Err(BlockError::ResidenceTime(residence_time));
        }
        Ok(Self {
            residence_time,
            initial_mass: 0.0,
        })
    }

    /// Sets the mass held at the start of a run.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::InitialMass`] if `mass` is negative or not finite.
    pub fn with_initial_mass(self, mass: f64) -> Result<Self, BlockError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(BlockError::InitialMass(mass));
        }
        Ok(Self {
            initial_mass: mass,
            ..self
        })
    }

    #[must_use]
    pub fn residence_time(&self) -> f64 {
        self.residence_time
    }

    #[must_use]
    pub fn initial_mass(&self) -> f64 {
        self.initial_mass
    }

    /// Returns the outflow rate for a held mass.
    #[must_use]
    pub fn outflow(&self, mass: f64) -> f64 {
        mass / self.residence_time
    }

    /// Returns `dM/dt` for the given inflow and held mass.
    #[must_use]
    pub fn rate_of_change(&self, inflow: f64, mass: f64) -> f64 {
        inflow - self.outflow(mass)
    }

    pub(crate) fn output(&self, mass: f64, out: &mut [f64]) {
        out[0] = self.outflow(mass);
        out[1] = mass;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_state_holds_inflow_times_residence_time() {
        let process = Process::new(4.0).unwrap();
        let inflow = 3.0;
        let steady = inflow * process.residence_time();

        assert_eq!(process.rate_of_change(inflow, steady), 0.0);
        assert_eq!(process.outflow(steady), inflow);
    }

    #[test]
    fn rejects_non_positive_residence_time() {
        assert_eq!(Process::new(-1.0), Err(BlockError::ResidenceTime(-1.0)));
        assert!(Process::new(f64::NAN).is_err());
    }

    #[test]
    fn initial_mass_must_be_non_negative() {
        let process = Process::new(1.0).unwrap();
        assert_eq!(
            process.with_initial_mass(-0.5),
            Err(BlockError::InitialMass(-0.5))
        );
        assert_eq!(process.with_initial_mass(2.0).unwrap().initial_mass(), 2.0);
    }
}
