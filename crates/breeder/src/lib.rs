//! The BABY tritium breeding experiment as a transport network.
//!
//! [`BreederParameters`] carries the physical inputs as `uom` quantities and
//! derives the scalar residence times, release fractions, and production
//! rate. [`build_network`] wires them into the reference topology, and
//! [`BreederConfig`] reads the whole setup from TOML.
//!
//! ```ignore
//! use tritium_breeder::{BreederConfig, Recorder};
//! use tritium_solvers::transient::ssprk22;
//!
//! let config = BreederConfig::default();
//! let network = config.network()?;
//!
//! let mut recorder = Recorder::new(&network);
//! ssprk22::solve(&network, config.horizon(), &mut recorder)?;
//! ```

mod config;
mod model;
mod parameters;
mod recorder;

pub use config::{BreederConfig, ConfigFileError, RunConfig, SolverConfig};
pub use model::{Sampling, build_network};
pub use parameters::{BreederParameters, DerivedParameters, ParameterError};
pub use recorder::{Recorder, Trace};
