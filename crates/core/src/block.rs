//! The block library.
//!
//! Every block kind exposes the same contract, dispatched by [`Block`]:
//!
//! - ordered input and output port names
//! - a continuous state dimension (zero for stateless kinds)
//! - which outputs depend directly on which inputs ("feedthrough")
//! - an output function and, for stateful kinds, a state derivative
//!
//! Kinds validate their parameters on construction and return a
//! [`BlockError`] when a precondition does not hold.

mod bubbler;
mod combiner;
mod integrator;
mod probe;
mod process;
mod scaler;
mod source;
mod splitter;

use thiserror::Error;

use crate::{RotationSchedule, ScheduleError};

pub use bubbler::{Bubbler, BubblerConfig, ResiduePolicy};
pub use combiner::Combiner;
pub use integrator::Integrator;
pub use probe::Probe;
pub use process::Process;
pub use scaler::Scaler;
pub use source::Source;
pub use splitter::Splitter;

/// Tolerance on the sum of splitter fractions.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-9;

/// Errors that can occur when constructing a block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    #[error("{parameter} must be finite, got {value}")]
    NotFinite { parameter: &'static str, value: f64 },

    #[error("active window end ({end}) must be after its start ({start})")]
    Window { start: f64, end: f64 },

    #[error("block must have at least one port")]
    NoPorts,

    #[error("duplicate port name: {0}")]
    DuplicatePort(String),

    #[error("residence time must be finite and positive, got {0}")]
    ResidenceTime(f64),

    #[error("initial mass must be finite and non-negative, got {0}")]
    InitialMass(f64),

    #[error("split fraction for {port} must be within [0, 1], got {value}")]
    SplitFraction { port: String, value: f64 },

    #[error("split fractions must sum to 1, got {sum}")]
    SplitSum { sum: f64 },

    #[error("{parameter} must be within [0, 1], got {value}")]
    Efficiency { parameter: &'static str, value: f64 },

    #[error("invalid rotation schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Values a block sees when it is evaluated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub t: f64,
    pub inputs: &'a [f64],
    pub state: &'a [f64],
    pub active_vial: usize,
}

/// A flow-transforming unit of a transport network.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Source(Source),
    Scaler(Scaler),
    Combiner(Combiner),
    Process(Process),
    Splitter(Splitter),
    Bubbler(Bubbler),
    Integrator(Integrator),
    Probe(Probe),
}

impl Block {
    /// Returns the ordered input port names.
    #[must_use]
    pub fn inputs(&self) -> Vec<String> {
        match self {
            Self::Source(_) => Vec::new(),
            Self::Scaler(_) => names(&[Scaler::INPUT]),
            Self::Combiner(b) => b.inputs(),
            Self::Process(_) => names(&[Process::INFLOW]),
            Self::Splitter(_) => names(&[Splitter::INPUT]),
            Self::Bubbler(_) => names(&[Bubbler::SOLUBLE, Bubbler::INSOLUBLE]),
            Self::Integrator(_) => names(&[Integrator::INPUT]),
            Self::Probe(b) => b.labels().to_vec(),
        }
    }

    /// Returns the ordered output port names.
    #[must_use]
    pub fn outputs(&self) -> Vec<String> {
        match self {
            Self::Source(_) => names(&[Source::OUTPUT]),
            Self::Scaler(_) => names(&[Scaler::OUTPUT]),
            Self::Combiner(_) => names(&[Combiner::OUTPUT]),
            Self::Process(_) => names(&[Process::MASS_FLOW_RATE, Process::INVENTORY]),
            Self::Splitter(b) => b.outputs().to_vec(),
            Self::Bubbler(b) => b.outputs(),
            Self::Integrator(_) => names(&[Integrator::OUTPUT]),
            Self::Probe(_) => Vec::new(),
        }
    }

    /// Returns the number of continuous state variables.
    #[must_use]
    pub fn state_dim(&self) -> usize {
        match self {
            Self::Process(_) | Self::Integrator(_) => 1,
            Self::Bubbler(b) => b.vial_count(),
            _ => 0,
        }
    }

    /// Returns the continuous state at the start of a run.
    #[must_use]
    pub fn initial_state(&self) -> Vec<f64> {
        match self {
            Self::Process(b) => vec![b.initial_mass()],
            Self::Integrator(b) => vec![b.initial_value()],
            Self::Bubbler(b) => vec![0.0; b.vial_count()],
            _ => Vec::new(),
        }
    }

    /// Returns `true` if `output` depends directly on the value at `input`.
    ///
    /// Outputs of state-holding kinds depend only on their state, which is
    /// what breaks feedback loops.
    #[must_use]
    pub fn feeds_through(&self, input: usize, output: usize) -> bool {
        match self {
            Self::Scaler(_) | Self::Combiner(_) | Self::Splitter(_) => true,
            Self::Bubbler(_) => input < 2 && output == Bubbler::SAMPLE_OUT_INDEX,
            Self::Source(_) | Self::Process(_) | Self::Integrator(_) | Self::Probe(_) => false,
        }
    }

    /// Returns `true` if any output depends directly on any input.
    #[must_use]
    pub fn has_feedthrough(&self) -> bool {
        matches!(
            self,
            Self::Scaler(_) | Self::Combiner(_) | Self::Splitter(_) | Self::Bubbler(_)
        )
    }

    /// Returns the rotation schedule if this block is a rotating bubbler.
    #[must_use]
    pub fn schedule(&self) -> Option<&RotationSchedule> {
        match self {
            Self::Bubbler(b) => b.schedule(),
            _ => None,
        }
    }

    /// Returns times at which the block's output is discontinuous in time.
    #[must_use]
    pub fn breakpoints(&self) -> Vec<f64> {
        match self {
            Self::Source(b) => b.breakpoints(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn output(&self, ctx: &Context<'_>, out: &mut [f64]) {
        match self {
            Self::Source(b) => out[0] = b.value(ctx.t),
            Self::Scaler(b) => out[0] = b.apply(ctx.inputs[0]),
            Self::Combiner(_) => out[0] = ctx.inputs.iter().sum(),
            Self::Process(b) => b.output(ctx.state[0], out),
            Self::Splitter(b) => b.split(ctx.inputs[0], out),
            Self::Bubbler(b) => b.output(ctx, out),
            Self::Integrator(_) => out[0] = ctx.state[0],
            Self::Probe(_) => {}
        }
    }

    pub(crate) fn derivative(&self, ctx: &Context<'_>, dx: &mut [f64]) {
        match self {
            Self::Process(b) => dx[0] = b.rate_of_change(ctx.inputs[0], ctx.state[0]),
            Self::Integrator(_) => dx[0] = ctx.inputs[0],
            Self::Bubbler(b) => b.derivative(ctx, dx),
            _ => {}
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|&name| name.to_owned()).collect()
}

pub(crate) fn check_finite(parameter: &'static str, value: f64) -> Result<(), BlockError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BlockError::NotFinite { parameter, value })
    }
}

macro_rules! impl_from_kind {
    ($($kind:ident),*) => {
        $(
            impl From<$kind> for Block {
                fn from(block: $kind) -> Self {
                    Self::$kind(block)
                }
            }
        )*
    };
}

impl_from_kind!(Source, Scaler, Combiner, Process, Splitter, Bubbler, Integrator, Probe);
