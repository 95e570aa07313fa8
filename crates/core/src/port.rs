use std::fmt;

/// Position of a block within an assembled [`Network`](crate::Network).
///
/// Ids are assigned in registration order when the network is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

impl BlockId {
    /// Returns the index of the block in the network's block list.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifies a port on a block, either by name or by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortKey {
    Name(String),
    Index(usize),
}

impl PortKey {
    /// Resolves this key against a block's ordered port names.
    pub(crate) fn resolve(&self, names: &[String]) -> Option<usize> {
        match self {
            Self::Name(name) => names.iter().position(|n| n == name),
            Self::Index(index) => (*index < names.len()).then_some(*index),
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&str> for PortKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for PortKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for PortKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A port on a named block.
///
/// Tuples of a block name and a port name or index convert directly:
///
/// ```
/// use tritium_core::{PortKey, PortRef};
///
/// let named: PortRef = ("baby", "mass_flow_rate").into();
/// let indexed: PortRef = ("environment", 1_usize).into();
///
/// assert_eq!(named.port, PortKey::Name("mass_flow_rate".into()));
/// assert_eq!(indexed.port, PortKey::Index(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub block: String,
    pub port: PortKey,
}

impl PortRef {
    #[must_use]
    pub fn new(block: impl Into<String>, port: impl Into<PortKey>) -> Self {
        Self {
            block: block.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block, self.port)
    }
}

impl<B: Into<String>, P: Into<PortKey>> From<(B, P)> for PortRef {
    fn from((block, port): (B, P)) -> Self {
        Self::new(block, port)
    }
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
}
