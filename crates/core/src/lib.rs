//! Core types for compartmental tritium transport networks.
//!
//! A transport network is a directed graph of flow-transforming blocks wired
//! output-to-input by named ports:
//!
//! - [`block`]: the closed set of block kinds ([`Source`], [`Scaler`],
//!   [`Combiner`], [`Process`], [`Splitter`], [`Bubbler`], [`Integrator`],
//!   [`Probe`]) and their per-kind semantics
//! - [`RotationSchedule`]: vial rotation times and the [`Event`]s they produce
//! - [`NetworkBuilder`]: registers blocks and connections by name and
//!   validates them into an immutable [`Network`]
//! - [`Network`]: the assembled system: state derivative, outputs, probe
//!   channels, and the merged event schedule
//! - [`SolverSettings`]: knobs consumed by an integration driver
//! - [`Observer`]: receives driver events and optionally returns control actions
//!
//! Integration itself lives outside this crate. A driver only needs
//! [`Network::derivative`], [`Network::apply_event`], and the settings.

pub mod block;
mod builder;
mod network;
mod observer;
mod port;
mod schedule;
mod settings;
mod state;

pub use block::{
    Block, BlockError, Bubbler, BubblerConfig, Combiner, Integrator, Probe, Process,
    ResiduePolicy, Scaler, Source, Splitter,
};
pub use builder::{ConfigError, NetworkBuilder};
pub use network::{Channel, Network, Outputs, RunError};
pub use observer::Observer;
pub use port::{BlockId, Connection, PortKey, PortRef};
pub use schedule::{Event, RotationSchedule, ScheduleError};
pub use settings::{SettingsError, SolverSettings};
pub use state::{Snapshot, StepIntegrable, SystemState};
