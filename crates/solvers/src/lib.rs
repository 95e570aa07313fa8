//! Integration drivers for [`tritium_core::Network`].

pub mod transient;
