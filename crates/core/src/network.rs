//! The assembled, immutable transport network.

mod error;
mod outputs;

use petgraph::{
    algo::{tarjan_scc, toposort},
    graph::{DiGraph, NodeIndex},
};
use tracing::{debug, trace};

use crate::{
    Block, BlockId, Event, SolverSettings, SystemState,
    block::Context,
};

pub use error::RunError;
pub use outputs::{Channel, Outputs};

/// A validated network of blocks, ready to be integrated.
///
/// Built by [`NetworkBuilder`](crate::NetworkBuilder). The network owns no
/// run state: every method takes a [`SystemState`] and a time, so a driver is
/// free to evaluate trial states while it adapts its step size.
#[derive(Debug, Clone)]
pub struct Network {
    names: Vec<String>,
    blocks: Vec<Block>,
    outputs: Vec<Vec<String>>,
    output_offsets: Vec<usize>,
    sources: Vec<Vec<usize>>,
    state_offsets: Vec<usize>,
    vial_slots: Vec<Option<usize>>,
    vial_count: usize,
    order: Vec<usize>,
    iterate: bool,
    events: Vec<Event>,
    breakpoints: Vec<f64>,
    settings: SolverSettings,
}

impl Network {
    pub(crate) fn new(
        names: Vec<String>,
        blocks: Vec<Block>,
        outputs: Vec<Vec<String>>,
        output_offsets: Vec<usize>,
        sources: Vec<Vec<usize>>,
        settings: SolverSettings,
    ) -> Self {
        let mut state_offsets = Vec::with_capacity(blocks.len() + 1);
        let mut offset = 0;
        for block in &blocks {
            state_offsets.push(offset);
            offset += block.state_dim();
        }
        state_offsets.push(offset);

        let mut vial_count = 0;
        let vial_slots = blocks
            .iter()
            .map(|block| {
                matches!(block, Block::Bubbler(_)).then(|| {
                    vial_count += 1;
                    vial_count - 1
                })
            })
            .collect();

        let mut events: Vec<Event> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| block.schedule().map(|s| s.events(BlockId(index))))
            .flatten()
            .collect();
        events.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut breakpoints: Vec<f64> = blocks.iter().flat_map(Block::breakpoints).collect();
        breakpoints.sort_by(f64::total_cmp);
        breakpoints.dedup();

        let (order, iterate) = evaluation_order(&blocks, &output_offsets, &sources);

        Self {
            names,
            blocks,
            outputs,
            output_offsets,
            sources,
            state_offsets,
            vial_slots,
            vial_count,
            order,
            iterate,
            events,
            breakpoints,
            settings,
        }
    }

    /// Returns block names in registration order.
    #[must_use]
    pub fn block_names(&self) -> &[String] {
        &self.names
    }

    /// Returns the number of continuous state variables.
    #[must_use]
    pub fn state_dim(&self) -> usize {
        self.state_offsets.last().copied().unwrap_or(0)
    }

    /// Returns the settings the network was built with.
    #[must_use]
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Returns all vial rotations, ordered by time.
    ///
    /// Rotations from different bubblers at the same time are all kept, in
    /// bubbler registration order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns the sorted times at which a source output jumps.
    #[must_use]
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    /// Returns `true` if port values need fixed-point iteration to resolve.
    #[must_use]
    pub fn requires_iteration(&self) -> bool {
        self.iterate
    }

    /// Returns the state at the start of a run.
    ///
    /// Compartments and integrators hold their configured initial values,
    /// vials are empty, and every bubbler starts on its first vial.
    #[must_use]
    pub fn initial_state(&self) -> SystemState {
        SystemState {
            values: self.blocks.iter().flat_map(Block::initial_state).collect(),
            active_vials: vec![0; self.vial_count],
        }
    }

    /// Returns the state of the named block within `state`.
    #[must_use]
    pub fn block_state<'s>(&self, state: &'s SystemState, name: &str) -> Option<&'s [f64]> {
        let index = self.block_index(name)?;
        state
            .values
            .get(self.state_offsets[index]..self.state_offsets[index + 1])
    }

    /// Returns the active vial of the named bubbler within `state`.
    #[must_use]
    pub fn active_vial(&self, state: &SystemState, name: &str) -> Option<usize> {
        let slot = self.vial_slots[self.block_index(name)?]?;
        state.active_vials.get(slot).copied()
    }

    /// Computes the time derivative of the continuous state.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the state does not match the network or port
    /// values fail to converge.
    pub fn derivative(&self, state: &SystemState, t: f64) -> Result<Vec<f64>, RunError> {
        let ports = self.resolve(state, t)?;

        let mut dx = vec![0.0; self.state_dim()];
        let mut inputs = Vec::new();
        for (index, block) in self.blocks.iter().enumerate() {
            let range = self.state_offsets[index]..self.state_offsets[index + 1];
            if range.is_empty() {
                continue;
            }
            self.gather(index, &ports, &mut inputs);
            let ctx = self.context(index, state, t, &inputs);
            block.derivative(&ctx, &mut dx[range]);
        }

        Ok(dx)
    }

    /// Evaluates every block's outputs.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the state does not match the network or port
    /// values fail to converge.
    pub fn outputs(&self, state: &SystemState, t: f64) -> Result<Outputs<'_>, RunError> {
        Ok(Outputs::new(self, self.resolve(state, t)?))
    }

    /// Evaluates the values arriving at every probe input.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the state does not match the network or port
    /// values fail to converge.
    pub fn channels(&self, state: &SystemState, t: f64) -> Result<Vec<Channel<'_>>, RunError> {
        let ports = self.resolve(state, t)?;
        let ports = &ports;

        let channels = self
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match block {
                Block::Probe(probe) => Some((index, probe)),
                _ => None,
            })
            .flat_map(move |(index, probe)| {
                let probe_name = self.names[index].as_str();
                probe
                    .labels()
                    .iter()
                    .zip(&self.sources[index])
                    .map(move |(label, &source)| Channel {
                        probe: probe_name,
                        label: label.as_str(),
                        value: ports[source],
                    })
            })
            .collect();

        Ok(channels)
    }

    /// Applies a vial rotation to `state`.
    ///
    /// The bubbler's active vial advances to `event.vial`, which starts empty.
    /// The previous vial keeps the value it held at the rotation time.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::NotABubbler`] if the event targets another block
    /// kind, or [`RunError::EventOutOfOrder`] unless `event.vial` directly
    /// follows the active vial.
    pub fn apply_event(&self, state: &mut SystemState, event: &Event) -> Result<(), RunError> {
        let index = event.bubbler.index();
        let slot = self
            .vial_slots
            .get(index)
            .copied()
            .flatten()
            .ok_or(RunError::NotABubbler(index))?;
        self.check_shape(state)?;

        let active = state.active_vials[slot];
        let vial_count = self.state_offsets[index + 1] - self.state_offsets[index];
        if event.vial != active + 1 || event.vial >= vial_count {
            return Err(RunError::EventOutOfOrder {
                block: self.names[index].clone(),
                time: event.time,
                active,
                requested: event.vial,
            });
        }

        state.active_vials[slot] = event.vial;
        state.values[self.state_offsets[index] + event.vial] = 0.0;

        debug!(
            bubbler = %self.names[index],
            time = event.time,
            frozen = state.values[self.state_offsets[index] + active],
            vial = event.vial + 1,
            "rotated vial"
        );

        Ok(())
    }

    /// Checks that no compartment holds negative mass beyond the tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::NegativeMass`] naming the first offending block.
    pub fn check_state(&self, state: &SystemState, t: f64) -> Result<(), RunError> {
        self.check_shape(state)?;

        let tolerance = self.settings.mass_tolerance();
        for (index, block) in self.blocks.iter().enumerate() {
            if let Block::Process(_) = block {
                let mass = state.values[self.state_offsets[index]];
                if mass < -tolerance {
                    return Err(RunError::NegativeMass {
                        block: self.names[index].clone(),
                        time: t,
                        mass,
                    });
                }
            }
        }

        Ok(())
    }

    pub(crate) fn block_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub(crate) fn output_names(&self, index: usize) -> &[String] {
        &self.outputs[index]
    }

    pub(crate) fn output_offset(&self, index: usize) -> usize {
        self.output_offsets[index]
    }

    fn check_shape(&self, state: &SystemState) -> Result<(), RunError> {
        if state.values.len() != self.state_dim() || state.active_vials.len() != self.vial_count {
            return Err(RunError::StateShape {
                expected: self.state_dim(),
                found: state.values.len(),
                expected_vials: self.vial_count,
                found_vials: state.active_vials.len(),
            });
        }

        for (index, slot) in self.vial_slots.iter().enumerate() {
            let Some(slot) = *slot else { continue };
            let vials = self.state_offsets[index + 1] - self.state_offsets[index];
            let active = state.active_vials[slot];
            if active >= vials {
                return Err(RunError::ActiveVial {
                    block: self.names[index].clone(),
                    active,
                    vials,
                });
            }
        }

        Ok(())
    }

    /// Resolves every output port value at time `t`.
    ///
    /// A single sweep in evaluation order suffices for acyclic wiring.
    /// Otherwise sweeps repeat until every port value changes by no more than
    /// `tolerance × max(1, |value|)`, up to the configured iteration cap.
    fn resolve(&self, state: &SystemState, t: f64) -> Result<Vec<f64>, RunError> {
        self.check_shape(state)?;

        let mut ports = vec![0.0; self.output_offsets.last().copied().unwrap_or(0)];
        let mut inputs = Vec::new();

        if !self.iterate {
            self.sweep(state, t, &mut ports, &mut inputs);
            return Ok(ports);
        }

        let tolerance = self.settings.fixed_point_tolerance();
        let max_iterations = self.settings.max_iterations();
        let mut previous = ports.clone();

        for iteration in 1..=max_iterations {
            self.sweep(state, t, &mut ports, &mut inputs);

            let converged = ports
                .iter()
                .zip(&previous)
                .all(|(new, old)| (new - old).abs() <= tolerance * new.abs().max(1.0));

            if iteration > 1 && converged {
                trace!(time = t, iteration, "port values converged");
                return Ok(ports);
            }
            previous.copy_from_slice(&ports);
        }

        Err(RunError::FixedPointDiverged {
            time: t,
            iterations: max_iterations,
        })
    }

    fn sweep(&self, state: &SystemState, t: f64, ports: &mut [f64], inputs: &mut Vec<f64>) {
        for &index in &self.order {
            self.gather(index, ports, inputs);
            let ctx = self.context(index, state, t, inputs);
            let range = self.output_offsets[index]..self.output_offsets[index + 1];
            self.blocks[index].output(&ctx, &mut ports[range]);
        }
    }

    fn gather(&self, index: usize, ports: &[f64], inputs: &mut Vec<f64>) {
        inputs.clear();
        inputs.extend(self.sources[index].iter().map(|&source| ports[source]));
    }

    fn context<'a>(
        &self,
        index: usize,
        state: &'a SystemState,
        t: f64,
        inputs: &'a [f64],
    ) -> Context<'a> {
        Context {
            t,
            inputs,
            state: &state.values[self.state_offsets[index]..self.state_offsets[index + 1]],
            active_vial: self.vial_slots[index].map_or(0, |slot| state.active_vials[slot]),
        }
    }
}

/// Orders blocks so each is evaluated after the blocks it reads directly.
///
/// Edges into blocks without feedthrough are ignored, since their outputs
/// depend only on state. Returns the order and whether a cycle remains that
/// requires fixed-point iteration.
fn evaluation_order(
    blocks: &[Block],
    output_offsets: &[usize],
    sources: &[Vec<usize>],
) -> (Vec<usize>, bool) {
    let mut owner = vec![0; output_offsets.last().copied().unwrap_or(0)];
    for block in 0..blocks.len() {
        owner[output_offsets[block]..output_offsets[block + 1]].fill(block);
    }

    let mut graph = DiGraph::<usize, ()>::with_capacity(blocks.len(), 0);
    for index in 0..blocks.len() {
        graph.add_node(index);
    }

    for (to, block) in blocks.iter().enumerate() {
        if !block.has_feedthrough() {
            continue;
        }
        for &source in &sources[to] {
            let edge = (NodeIndex::new(owner[source]), NodeIndex::new(to));
            if !graph.contains_edge(edge.0, edge.1) {
                graph.add_edge(edge.0, edge.1, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => (order.into_iter().map(NodeIndex::index).collect(), false),
        Err(_) => {
            let order = tarjan_scc(&graph)
                .into_iter()
                .rev()
                .flatten()
                .map(NodeIndex::index)
                .collect();
            (order, true)
        }
    }
}
