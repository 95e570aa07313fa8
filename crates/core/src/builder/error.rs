use thiserror::Error;

use crate::{BlockError, PortRef};

/// Errors detected while assembling a network, before any integration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("block {block}: {source}")]
    Block {
        block: String,
        #[source]
        source: BlockError,
    },

    #[error("duplicate block name: {0}")]
    DuplicateBlock(String),

    #[error("unknown block referenced by {0}")]
    UnknownBlock(PortRef),

    #[error("unknown port {0}")]
    UnknownPort(PortRef),

    #[error("{0} is an input port and cannot be a connection source")]
    NotAnOutput(PortRef),

    #[error("{0} is an output port and cannot be a connection target")]
    NotAnInput(PortRef),

    #[error("input {port} is fed by both {first} and {second}")]
    DuplicateInput {
        port: PortRef,
        first: PortRef,
        second: PortRef,
    },

    #[error("input {0} is not connected")]
    UnconnectedInput(PortRef),

    #[error("algebraic loop without a state-holding block: {}", .0.join(" -> "))]
    AlgebraicLoop(Vec<String>),
}

impl ConfigError {
    /// Returns the name of the block the error refers to, if any.
    #[must_use]
    pub fn block(&self) -> Option<&str> {
        match self {
            Self::Block { block, .. } | Self::DuplicateBlock(block) => Some(block),
            Self::UnknownBlock(port)
            | Self::UnknownPort(port)
            | Self::NotAnOutput(port)
            | Self::NotAnInput(port)
            | Self::UnconnectedInput(port)
            | Self::DuplicateInput { port, .. } => Some(&port.block),
            Self::AlgebraicLoop(blocks) => blocks.first().map(String::as_str),
        }
    }
}
