use super::Network;

/// Every block's output port values at one instant.
///
/// Returned by [`Network::outputs`].
#[derive(Debug, Clone)]
pub struct Outputs<'a> {
    network: &'a Network,
    values: Vec<f64>,
}

impl<'a> Outputs<'a> {
    pub(super) fn new(network: &'a Network, values: Vec<f64>) -> Self {
        Self { network, values }
    }

    /// Returns the value of `port` on `block`, if both exist.
    #[must_use]
    pub fn get(&self, block: &str, port: &str) -> Option<f64> {
        let index = self.network.block_index(block)?;
        let position = self.network.output_names(index).iter().position(|p| p == port)?;
        Some(self.values[self.network.output_offset(index) + position])
    }

    /// Iterates over `(block, port, value)` for every output port.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str, f64)> + '_ {
        let network = self.network;
        (0..network.block_names().len()).flat_map(move |block| {
            let offset = network.output_offset(block);
            network
                .output_names(block)
                .iter()
                .enumerate()
                .map(move |(i, port)| {
                    (
                        network.block_names()[block].as_str(),
                        port.as_str(),
                        self.values[offset + i],
                    )
                })
        })
    }

    /// Returns the raw port values in network order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A labeled probe input at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel<'a> {
    pub probe: &'a str,
    pub label: &'a str,
    pub value: f64,
}
