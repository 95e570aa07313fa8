//! Transient solvers that advance a network through time.

pub mod ssprk22;
