//! Registration and validation of blocks and connections.

mod error;

use std::collections::HashMap;

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use tracing::debug;

use crate::{Block, BlockError, Connection, Network, PortRef, SolverSettings};

pub use error::ConfigError;

/// Collects named blocks and connections and assembles them into a [`Network`].
///
/// Blocks and connections may be registered in any order; nothing is resolved
/// until [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use tritium_core::{Integrator, NetworkBuilder, Process, Source};
///
/// let mut builder = NetworkBuilder::new();
/// builder
///     .connect(("feed", "out"), ("tank", "inflow"))
///     .connect(("tank", "mass_flow_rate"), ("released", "in"));
/// builder.try_add("feed", Source::step(2.0, 0.0))?;
/// builder.try_add("tank", Process::new(10.0))?;
/// builder.add("released", Integrator::new())?;
///
/// let network = builder.build()?;
/// assert_eq!(network.state_dim(), 2);
/// # Ok::<(), tritium_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    names: Vec<String>,
    blocks: Vec<Block>,
    connections: Vec<Connection>,
    settings: SolverSettings,
}

impl NetworkBuilder {
    /// Creates an empty builder with default [`SolverSettings`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the settings carried by the assembled network.
    pub fn settings(&mut self, settings: SolverSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Registers a block under a unique name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateBlock`] if the name is already taken.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        block: impl Into<Block>,
    ) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(ConfigError::DuplicateBlock(name));
        }

        self.names.push(name);
        self.blocks.push(block.into());
        Ok(self)
    }

    /// Registers the result of a block constructor under a unique name.
    ///
    /// A constructor failure is reported as [`ConfigError::Block`] carrying
    /// `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` is an error or the name is already taken.
    pub fn try_add<B: Into<Block>>(
        &mut self,
        name: impl Into<String>,
        block: Result<B, BlockError>,
    ) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        match block {
            Ok(block) => self.add(name, block),
            Err(source) => Err(ConfigError::Block {
                block: name,
                source,
            }),
        }
    }

    /// Connects an output port to an input port.
    ///
    /// Endpoints are resolved when the network is built.
    pub fn connect(&mut self, from: impl Into<PortRef>, to: impl Into<PortRef>) -> &mut Self {
        self.connections.push(Connection {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Validates the registered blocks and connections and assembles them.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a connection refers to an unknown block or
    /// port, connects ports in the wrong direction, if an input port is fed
    /// more than once or not at all, or if the wiring contains an algebraic
    /// loop that no state-holding block breaks.
    pub fn build(self) -> Result<Network, ConfigError> {
        let inputs: Vec<Vec<String>> = self.blocks.iter().map(Block::inputs).collect();
        let outputs: Vec<Vec<String>> = self.blocks.iter().map(Block::outputs).collect();

        let mut output_offsets = Vec::with_capacity(self.blocks.len() + 1);
        let mut offset = 0;
        for ports in &outputs {
            output_offsets.push(offset);
            offset += ports.len();
        }
        output_offsets.push(offset);

        let index: HashMap<&str, usize> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut feeds: Vec<Vec<Option<&PortRef>>> =
            inputs.iter().map(|ports| vec![None; ports.len()]).collect();
        let mut sources: Vec<Vec<usize>> = inputs.iter().map(|ports| vec![0; ports.len()]).collect();

        for connection in &self.connections {
            let (from_block, from_port) =
                resolve(&index, &outputs, &inputs, &connection.from, Direction::Output)?;
            let (to_block, to_port) =
                resolve(&index, &outputs, &inputs, &connection.to, Direction::Input)?;

            let slot = &mut feeds[to_block][to_port];
            if let Some(first) = slot {
                return Err(ConfigError::DuplicateInput {
                    port: PortRef::new(&self.names[to_block], inputs[to_block][to_port].as_str()),
                    first: (*first).clone(),
                    second: connection.from.clone(),
                });
            }
            *slot = Some(&connection.from);
            sources[to_block][to_port] = output_offsets[from_block] + from_port;
        }

        for (block, slots) in feeds.iter().enumerate() {
            if let Some(port) = slots.iter().position(Option::is_none) {
                return Err(ConfigError::UnconnectedInput(PortRef::new(
                    &self.names[block],
                    inputs[block][port].as_str(),
                )));
            }
        }

        check_algebraic_loops(&self.names, &self.blocks, &output_offsets, &sources)?;

        let network = Network::new(
            self.names,
            self.blocks,
            outputs,
            output_offsets,
            sources,
            self.settings,
        );

        debug!(
            blocks = network.block_names().len(),
            states = network.state_dim(),
            events = network.events().len(),
            "assembled transport network"
        );

        Ok(network)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// Resolves a port reference to `(block index, port index)`.
fn resolve(
    index: &HashMap<&str, usize>,
    outputs: &[Vec<String>],
    inputs: &[Vec<String>],
    port: &PortRef,
    direction: Direction,
) -> Result<(usize, usize), ConfigError> {
    let &block = index
        .get(port.block.as_str())
        .ok_or_else(|| ConfigError::UnknownBlock(port.clone()))?;

    let (wanted, other) = match direction {
        Direction::Output => (&outputs[block], &inputs[block]),
        Direction::Input => (&inputs[block], &outputs[block]),
    };

    if let Some(position) = port.port.resolve(wanted) {
        return Ok((block, position));
    }

    // Indices are direction-relative, so only names can point the wrong way.
    if matches!(port.port, crate::PortKey::Name(_)) && port.port.resolve(other).is_some() {
        return Err(match direction {
            Direction::Output => ConfigError::NotAnOutput(port.clone()),
            Direction::Input => ConfigError::NotAnInput(port.clone()),
        });
    }

    Err(ConfigError::UnknownPort(port.clone()))
}

/// Rejects cycles of output ports that feed through without passing state.
///
/// Each node is an output port. An edge `a -> b` means `b` is computed
/// directly from `a` within the same instant.
fn check_algebraic_loops(
    names: &[String],
    blocks: &[Block],
    output_offsets: &[usize],
    sources: &[Vec<usize>],
) -> Result<(), ConfigError> {
    let port_count = output_offsets.last().copied().unwrap_or(0);
    let mut owner = vec![0; port_count];
    for block in 0..blocks.len() {
        owner[output_offsets[block]..output_offsets[block + 1]].fill(block);
    }

    let mut graph = DiGraph::<usize, ()>::with_capacity(port_count, 0);
    for port in 0..port_count {
        graph.add_node(port);
    }

    for (block, kind) in blocks.iter().enumerate() {
        let outputs = output_offsets[block + 1] - output_offsets[block];
        for (input, &source) in sources[block].iter().enumerate() {
            for output in (0..outputs).filter(|&o| kind.feeds_through(input, o)) {
                graph.add_edge(
                    NodeIndex::new(source),
                    NodeIndex::new(output_offsets[block] + output),
                    (),
                );
            }
        }
    }

    for component in tarjan_scc(&graph) {
        let is_loop = component.len() > 1
            || component
                .first()
                .is_some_and(|&node| graph.contains_edge(node, node));

        if is_loop {
            let mut involved: Vec<usize> = component.iter().map(|n| owner[n.index()]).collect();
            involved.sort_unstable();
            involved.dedup();
            return Err(ConfigError::AlgebraicLoop(
                involved.into_iter().map(|b| names[b].clone()).collect(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Bubbler, BubblerConfig, Combiner, Integrator, Probe, Process, Scaler, Source, Splitter};

    fn source_into_process() -> NetworkBuilder {
        let mut builder = NetworkBuilder::new();
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();
        builder.try_add("tank", Process::new(5.0)).unwrap();
        builder.connect(("feed", "out"), ("tank", "inflow"));
        builder
    }

    #[test]
    fn builds_regardless_of_registration_order() {
        let mut builder = NetworkBuilder::new();
        builder.connect(("tank", "inventory"), ("probe", "M"));
        builder.connect(("feed", "out"), ("tank", "inflow"));
        builder.try_add("probe", Probe::new(["M"])).unwrap();
        builder.try_add("tank", Process::new(5.0)).unwrap();
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();

        let network = builder.build().unwrap();
        assert_eq!(network.block_names(), ["probe", "tank", "feed"]);
        assert_eq!(network.state_dim(), 1);
    }

    #[test]
    fn reports_block_errors_by_name() {
        let mut builder = NetworkBuilder::new();
        let err = builder
            .try_add("iv_vs_ov", Splitter::new([("iv", 0.5), ("ov", 0.48)]))
            .unwrap_err();

        assert!(matches!(
            &err,
            ConfigError::Block {
                source: BlockError::SplitSum { .. },
                ..
            }
        ));
        assert_eq!(err.block(), Some("iv_vs_ov"));

        let err = builder.try_add("baby", Process::new(0.0)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Block {
                source: BlockError::ResidenceTime(_),
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut builder = source_into_process();
        assert_eq!(
            builder.add("tank", Integrator::new()).unwrap_err(),
            ConfigError::DuplicateBlock("tank".into())
        );
    }

    #[test]
    fn rejects_unknown_blocks_and_ports() {
        let mut builder = source_into_process();
        builder.connect(("tank", "inventory"), ("nowhere", "in"));
        assert!(matches!(
            builder.build(),
            Err(ConfigError::UnknownBlock(port)) if port.block == "nowhere"
        ));

        let mut builder = source_into_process();
        builder.add("acc", Integrator::new()).unwrap();
        builder.connect(("tank", "outflow"), ("acc", "in"));
        assert!(matches!(builder.build(), Err(ConfigError::UnknownPort(_))));
    }

    #[test]
    fn rejects_wrong_direction() {
        let mut builder = source_into_process();
        builder.add("acc", Integrator::new()).unwrap();
        builder.connect(("acc", "in"), ("tank", "inflow"));
        assert!(matches!(builder.build(), Err(ConfigError::NotAnOutput(_))));

        let mut builder = source_into_process();
        builder.add("acc", Integrator::new()).unwrap();
        builder.connect(("tank", "inventory"), ("acc", "out"));
        assert!(matches!(builder.build(), Err(ConfigError::NotAnInput(_))));
    }

    #[test]
    fn rejects_doubly_fed_input() {
        let mut builder = source_into_process();
        builder.try_add("other", Source::step(2.0, 0.0)).unwrap();
        builder.connect(("other", "out"), ("tank", "inflow"));

        match builder.build() {
            Err(ConfigError::DuplicateInput { port, first, second }) => {
                assert_eq!(port, PortRef::new("tank", "inflow"));
                assert_eq!(first.block, "feed");
                assert_eq!(second.block, "other");
            }
            other => panic!("expected duplicate input, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dangling_input() {
        let mut builder = source_into_process();
        builder.try_add("sum", Combiner::new(2)).unwrap();
        builder.connect(("tank", "mass_flow_rate"), ("sum", 0_usize));

        assert_eq!(
            builder.build().unwrap_err(),
            ConfigError::UnconnectedInput(PortRef::new("sum", "in1"))
        );
    }

    #[test]
    fn rejects_algebraic_loop() {
        let mut builder = NetworkBuilder::new();
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();
        builder.try_add("sum", Combiner::new(2)).unwrap();
        builder.try_add("gain", Scaler::new(0.5)).unwrap();
        builder
            .connect(("feed", "out"), ("sum", "in0"))
            .connect(("sum", "out"), ("gain", "in"))
            .connect(("gain", "out"), ("sum", "in1"));

        assert_eq!(
            builder.build().unwrap_err(),
            ConfigError::AlgebraicLoop(vec!["sum".into(), "gain".into()])
        );
    }

    #[test]
    fn loop_through_process_is_allowed() {
        let mut builder = NetworkBuilder::new();
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();
        builder.try_add("sum", Combiner::new(2)).unwrap();
        builder.try_add("tank", Process::new(2.0)).unwrap();
        builder
            .try_add("recycle", Splitter::two_way("back", "out", 0.3))
            .unwrap();
        builder.add("released", Integrator::new()).unwrap();
        builder
            .connect(("feed", "out"), ("sum", "in0"))
            .connect(("recycle", "back"), ("sum", "in1"))
            .connect(("sum", "out"), ("tank", "inflow"))
            .connect(("tank", "mass_flow_rate"), ("recycle", "in"))
            .connect(("recycle", "out"), ("released", "in"));

        assert!(builder.build().is_ok());
    }

    #[test]
    fn loop_through_bubbler_vial_is_allowed() {
        let mut builder = NetworkBuilder::new();
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();
        builder
            .try_add(
                "bubbler",
                Bubbler::new(BubblerConfig {
                    collection_efficiency: 0.5,
                    conversion_efficiency: 1.0,
                    replacement_times: vec![],
                    residue: Default::default(),
                }),
            )
            .unwrap();
        builder.try_add("gain", Scaler::new(0.1)).unwrap();
        builder
            .connect(("feed", "out"), ("bubbler", "sample_in_soluble"))
            .connect(("bubbler", "vial1"), ("gain", "in"))
            .connect(("gain", "out"), ("bubbler", "sample_in_insoluble"));

        assert!(builder.build().is_ok());

        let mut builder = NetworkBuilder::new();
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();
        builder
            .try_add(
                "bubbler",
                Bubbler::new(BubblerConfig {
                    collection_efficiency: 0.5,
                    conversion_efficiency: 1.0,
                    replacement_times: vec![],
                    residue: Default::default(),
                }),
            )
            .unwrap();
        builder.try_add("gain", Scaler::new(0.1)).unwrap();
        builder
            .connect(("feed", "out"), ("bubbler", "sample_in_soluble"))
            .connect(("bubbler", "sample_out"), ("gain", "in"))
            .connect(("gain", "out"), ("bubbler", "sample_in_insoluble"));

        assert!(matches!(
            builder.build(),
            Err(ConfigError::AlgebraicLoop(_))
        ));
    }
}
