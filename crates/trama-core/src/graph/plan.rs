//! Topology snapshots and the render plans compiled from them.
//!
//! Every successful mutation produces a new [`Topology`]: the sorted node and
//! connection sets, the [`ArcTable`] built from them, and the render order.
//! When the graph is prepared, the topology is compiled into a [`RenderPlan`]
//! that owns every buffer the render thread will touch, so rendering a block
//! never allocates.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::Arc;

use super::buffer::{AudioBuffer, MidiBuffer};
use super::connection::{ArcTable, Connection};
use super::node::{GraphNode, Lane, NodeId, NodeKind};

/// Immutable view of one topology generation.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    generation: u64,
    nodes: Vec<NodeId>,
    connections: Vec<Connection>,
    table: ArcTable,
    order: Vec<NodeId>,
}

impl Topology {
    pub(crate) fn build(
        generation: u64,
        nodes: impl IntoIterator<Item = NodeId>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Self {
        let mut nodes: Vec<NodeId> = nodes.into_iter().collect();
        nodes.sort_unstable();
        let mut connections: Vec<Connection> = connections.into_iter().collect();
        connections.sort_unstable();
        let table = ArcTable::build(&connections);
        let order = render_order(&nodes, &table);
        Self {
            generation,
            nodes,
            connections,
            table,
            order,
        }
    }

    /// Generation number; increases with every published change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Node ids in ascending order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Connections in ascending order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Reachability index for this generation.
    pub fn arc_table(&self) -> &ArcTable {
        &self.table
    }

    /// Nodes in render order.
    pub fn render_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Position of `node` in the render order.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == node)
    }
}

/// Kahn's algorithm with ties broken by ascending node id.
pub(crate) fn render_order(nodes: &[NodeId], table: &ArcTable) -> Vec<NodeId> {
    let mut pending: BTreeMap<NodeId, usize> = nodes.iter().map(|&n| (n, 0)).collect();
    let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for (dest, sources) in table.iter() {
        if let Some(count) = pending.get_mut(&dest) {
            *count = sources.len();
        }
        for &source in sources {
            successors.entry(source).or_default().push(dest);
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeId>> = pending
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&n, _)| Reverse(n))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &next in successors.get(&node).map_or(&[][..], Vec::as_slice) {
            if let Some(count) = pending.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
    }

    debug_assert_eq!(order.len(), nodes.len(), "render order left nodes behind: cycle");
    if order.len() < nodes.len() {
        for &node in nodes {
            if !order.contains(&node) {
                order.push(node);
            }
        }
    }
    order
}

/// How one connection's data reaches a step's inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RouteKind {
    /// Signal output summed into a signal input.
    Signal,
    /// Control value held across a signal input.
    ControlToSignal,
    /// Control value summed into a control input.
    Control,
    /// MIDI events merged into a MIDI input.
    Midi,
}

/// One incoming connection, resolved to step and buffer slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Route {
    pub source_step: usize,
    pub kind: RouteKind,
    pub from: usize,
    pub to: usize,
}

/// A node and the buffers it renders with.
pub(crate) struct RenderStep {
    pub node: Arc<GraphNode>,
    pub kind: NodeKind,
    pub audio_in: AudioBuffer,
    pub audio_out: AudioBuffer,
    pub control_in: Vec<f32>,
    pub control_out: Vec<f32>,
    pub midi_in: Vec<MidiBuffer>,
    pub midi_out: Vec<MidiBuffer>,
    pub routes: Vec<Route>,
    pub mute_gain: f32,
}

impl RenderStep {
    fn new(node: Arc<GraphNode>, block_size: usize) -> Self {
        let layout = node.layout();
        let midi = MidiBuffer::with_capacity(node.midi_capacity());
        Self {
            kind: node.kind(),
            audio_in: AudioBuffer::new(layout.signal_in, block_size),
            audio_out: AudioBuffer::new(layout.signal_out, block_size),
            control_in: vec![0.0; layout.control_in],
            control_out: vec![0.0; layout.control_out],
            midi_in: vec![midi.clone(); layout.midi_in],
            midi_out: vec![midi; layout.midi_out],
            routes: Vec::new(),
            mute_gain: if node.is_muted() { 0.0 } else { 1.0 },
            node,
        }
    }

    /// Zeroes every output of this step.
    pub(crate) fn silence(&mut self, frames: usize) {
        self.audio_out.clear_frames(frames);
        self.control_out.fill(0.0);
        for midi in &mut self.midi_out {
            midi.clear();
        }
    }
}

/// Everything the render thread needs for one topology generation.
pub(crate) struct RenderPlan {
    pub generation: u64,
    pub block_size: usize,
    pub steps: Vec<RenderStep>,
}

impl RenderPlan {
    /// A plan that renders silence.
    pub(crate) fn empty(generation: u64) -> Self {
        Self {
            generation,
            block_size: 0,
            steps: Vec::new(),
        }
    }

    /// Compiles `topology` against the resident nodes.
    pub(crate) fn build(
        topology: &Topology,
        nodes: &BTreeMap<NodeId, Arc<GraphNode>>,
        block_size: usize,
    ) -> Self {
        let mut index: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut steps: Vec<RenderStep> = Vec::with_capacity(topology.order.len());
        for id in &topology.order {
            if let Some(node) = nodes.get(id) {
                index.insert(*id, steps.len());
                steps.push(RenderStep::new(Arc::clone(node), block_size));
            }
        }

        for connection in &topology.connections {
            let (Some(&source_step), Some(&dest_step)) =
                (index.get(&connection.source), index.get(&connection.dest))
            else {
                continue;
            };
            debug_assert!(source_step < dest_step, "connection {connection} runs backwards");
            let (src_lane, from) = steps[source_step].node.layout().slot(connection.source_port);
            let (dst_lane, to) = steps[dest_step].node.layout().slot(connection.dest_port);
            let kind = match (src_lane, dst_lane) {
                (Lane::Signal, Lane::Signal) => RouteKind::Signal,
                (Lane::Control, Lane::Signal) => RouteKind::ControlToSignal,
                (Lane::Control, Lane::Control) => RouteKind::Control,
                (Lane::Midi, Lane::Midi) => RouteKind::Midi,
                _ => continue,
            };
            steps[dest_step].routes.push(Route {
                source_step,
                kind,
                from,
                to,
            });
        }

        Self {
            generation: topology.generation,
            block_size,
            steps,
        }
    }
}
