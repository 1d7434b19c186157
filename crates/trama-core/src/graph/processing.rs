//! The control-thread half of a graph: topology, validation, preparation.
//!
//! [`GraphProcessor`] owns every resident node (keyed by [`NodeId`]) and the
//! connection set. Each mutation validates, applies, then publishes a fresh
//! [`Topology`] and, once prepared, a render plan for the paired [`Renderer`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::atomic::{Contention, DEFAULT_RETRY_LIMIT};
use crate::oversample::OversampleFactor;
use crate::port::{PortCount, PortType};

use super::connection::Connection;
use super::events::{EventQueue, GraphEvent, SubscriptionId};
use super::factory::NodeFactory;
use super::node::{GraphId, GraphNode, NodeId, NodeInit, NodeKind};
use super::plan::{RenderPlan, Topology};
use super::processor::Processor;
use super::render::{RenderShared, RenderStats, Renderer};
use super::subgraph::SubGraphProcessor;

/// A rejected graph operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// No resident node has this id.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// The port does not exist, or points the wrong way for its end of the connection.
    #[error("node {node} has no usable port {port}")]
    InvalidPort {
        /// Node addressed.
        node: NodeId,
        /// Port index requested.
        port: u32,
    },
    /// Source and destination are the same node.
    #[error("node {0} cannot connect to itself")]
    SelfConnection(NodeId),
    /// The exact connection already exists.
    #[error("connection {0} already exists")]
    DuplicateConnection(Connection),
    /// The connection would close a cycle.
    #[error("connection {0} would create a cycle")]
    CycleDetected(Connection),
    /// Port types cannot be connected.
    #[error("cannot connect {output} output to {input} input")]
    IncompatiblePortType {
        /// Source port type.
        output: PortType,
        /// Destination port type.
        input: PortType,
    },
    /// No factory provider knows this type id.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
    /// The operation needs a prepared graph.
    #[error("graph is not prepared")]
    NotPrepared,
    /// The renderer has not consumed earlier plans yet.
    #[error("render plan queue is full")]
    PlanQueueFull,
    /// A bounded atomic write gave up.
    #[error(transparent)]
    Contention(#[from] Contention),
}

/// Construction-time configuration for a graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphSettings {
    /// Sample rate used until the first `prepare_to_play`.
    pub sample_rate: f64,
    /// Maximum frames per block.
    pub block_size: usize,
    /// Retry bound for control-thread atomic writes.
    pub retry_limit: u32,
    /// Render plans that may be in flight to the renderer.
    pub plan_queue_capacity: usize,
    /// Events each MIDI buffer holds.
    pub midi_event_capacity: usize,
    /// Host ports exposed through the I/O nodes: audio and MIDI inputs/outputs.
    pub io: PortCount,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 512,
            retry_limit: DEFAULT_RETRY_LIMIT,
            plan_queue_capacity: 8,
            midi_event_capacity: 512,
            io: PortCount::new()
                .with(PortType::Audio, 2, 2)
                .with(PortType::Midi, 1, 1),
        }
    }
}

/// Lifecycle of a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingState {
    /// No render configuration.
    Idle,
    /// Prepared, renderer not yet running.
    Prepared,
    /// Prepared and the renderer has rendered at least one block.
    Rendering,
}

/// Owns a graph's nodes and connections. Lives on the control thread.
///
/// # Example
///
/// ```rust
/// use trama_core::{GraphProcessor, GraphSettings, NodeKind};
///
/// let (mut graph, _renderer) = GraphProcessor::new(GraphSettings::default());
/// let input = graph.add_io_node(NodeKind::AudioInput).unwrap();
/// let output = graph.add_io_node(NodeKind::AudioOutput).unwrap();
/// graph.add_connection(input, 0, output, 0).unwrap();
/// assert_eq!(graph.render_order(), vec![input, output]);
/// ```
pub struct GraphProcessor {
    id: GraphId,
    settings: GraphSettings,
    factory: Option<Arc<NodeFactory>>,
    nodes: BTreeMap<NodeId, Arc<GraphNode>>,
    connections: BTreeSet<Connection>,
    sub_graphs: BTreeMap<NodeId, GraphProcessor>,
    next_id: u32,
    generation: u64,
    topology: ArcSwap<Topology>,
    prepared: bool,
    plan_tx: rtrb::Producer<RenderPlan>,
    retired: rtrb::Consumer<RenderPlan>,
    pending_plan: Option<RenderPlan>,
    shared: Arc<RenderShared>,
    events: EventQueue,
}

impl core::fmt::Debug for GraphProcessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GraphProcessor")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl GraphProcessor {
    /// Creates an idle graph and the renderer that plays it.
    pub fn new(settings: GraphSettings) -> (Self, Renderer) {
        Self::build(settings, None)
    }

    /// Like [`new`](Self::new), with a factory for [`add_node_of_type`](Self::add_node_of_type).
    pub fn with_factory(settings: GraphSettings, factory: Arc<NodeFactory>) -> (Self, Renderer) {
        Self::build(settings, Some(factory))
    }

    fn build(settings: GraphSettings, factory: Option<Arc<NodeFactory>>) -> (Self, Renderer) {
        let capacity = settings.plan_queue_capacity.max(1);
        let (plan_tx, plan_rx) = rtrb::RingBuffer::new(capacity);
        let (retired_tx, retired) = rtrb::RingBuffer::new(capacity);
        let shared = Arc::new(RenderShared::default());
        let renderer = Renderer::new(plan_rx, retired_tx, Arc::clone(&shared));
        let graph = Self {
            id: GraphId::next(),
            settings,
            factory,
            nodes: BTreeMap::new(),
            connections: BTreeSet::new(),
            sub_graphs: BTreeMap::new(),
            next_id: 1,
            generation: 0,
            topology: ArcSwap::from_pointee(Topology::default()),
            prepared: false,
            plan_tx,
            retired,
            pending_plan: None,
            shared,
            events: EventQueue::default(),
        };
        (graph, renderer)
    }

    /// This graph's id.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Current settings, including the last prepared rate and block size.
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Lifecycle state.
    pub fn state(&self) -> ProcessingState {
        if !self.prepared {
            ProcessingState::Idle
        } else if self.shared.rendering.load(core::sync::atomic::Ordering::Acquire) {
            ProcessingState::Rendering
        } else {
            ProcessingState::Prepared
        }
    }

    // ── Lifecycle ──

    /// Prepares every resident node (and nested graph) and publishes a render plan.
    ///
    /// Safe to call again with new parameters. Nodes that fail stay resident,
    /// render silence, and queue [`GraphEvent::PrepareFailed`]. Call this
    /// between render blocks, not while the renderer is running blocks larger
    /// than `block_size`.
    pub fn prepare_to_play(&mut self, sample_rate: f64, block_size: usize) {
        self.settings.sample_rate = sample_rate;
        self.settings.block_size = block_size;
        self.prepared = true;

        for (id, node) in &self.nodes {
            if let Some(inner) = self.sub_graphs.get_mut(id) {
                let factor = node.oversampling().factor();
                inner.prepare_to_play(sample_rate * factor as f64, block_size * factor);
            }
            prepare_node(node, &self.settings, self.id, &mut self.events);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_prepare: {} nodes at {sample_rate} Hz, {block_size} frames",
            self.nodes.len()
        );
        self.publish();
    }

    /// Unprepares every node, renders silence from now on, and returns to idle.
    pub fn release_resources(&mut self) {
        for node in self.nodes.values() {
            node.unprepare();
        }
        for inner in self.sub_graphs.values_mut() {
            inner.release_resources();
        }
        self.prepared = false;
        self.shared
            .rendering
            .store(false, core::sync::atomic::Ordering::Release);
        self.generation += 1;
        self.send_plan(RenderPlan::empty(self.generation));
        self.events.push(GraphEvent::Released);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_release: generation {}", self.generation);
    }

    // ── Nodes ──

    /// Adds a node hosting `processor`.
    pub fn add_node(&mut self, processor: Box<dyn Processor>) -> NodeId {
        let ports = processor.ports(self.settings.sample_rate, self.settings.block_size);
        let name = processor.name().to_string();
        self.insert_node(NodeKind::Processor, name, ports, Some(processor))
    }

    /// Adds a node created by the factory.
    pub fn add_node_of_type(&mut self, type_id: &str) -> Result<NodeId, GraphError> {
        let processor = self
            .factory
            .as_ref()
            .and_then(|f| f.instantiate(type_id))
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;
        Ok(self.add_node(processor))
    }

    /// Adds a host I/O node sized from [`GraphSettings::io`].
    pub fn add_io_node(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        let io = self.settings.io;
        let ports = match kind {
            NodeKind::AudioInput => PortCount::new().with(PortType::Audio, 0, io.get(PortType::Audio, true)),
            NodeKind::AudioOutput => PortCount::new().with(PortType::Audio, io.get(PortType::Audio, false), 0),
            NodeKind::MidiInput => PortCount::new().with(PortType::Midi, 0, 1),
            NodeKind::MidiOutput => PortCount::new().with(PortType::Midi, 1, 0),
            NodeKind::SubGraph | NodeKind::Processor => {
                return Err(GraphError::UnknownNodeType(kind.name().to_string()));
            }
        };
        Ok(self.insert_node(kind, kind.name().to_string(), ports, None))
    }

    /// Adds a node hosting a nested graph built from `settings`.
    ///
    /// The nested graph is edited through [`sub_graph_mut`](Self::sub_graph_mut)
    /// and rendered inline by this graph's renderer.
    pub fn add_sub_graph(&mut self, settings: GraphSettings) -> NodeId {
        let (mut inner, renderer) = Self::build(settings, self.factory.clone());
        if self.prepared {
            inner.prepare_to_play(self.settings.sample_rate, self.settings.block_size);
        }
        let processor = SubGraphProcessor::new(renderer, settings.io);
        let ports = processor.ports(self.settings.sample_rate, self.settings.block_size);
        let id = self.insert_node(
            NodeKind::SubGraph,
            NodeKind::SubGraph.name().to_string(),
            ports,
            Some(Box::new(processor)),
        );
        self.sub_graphs.insert(id, inner);
        id
    }

    fn insert_node(
        &mut self,
        kind: NodeKind,
        name: String,
        ports: PortCount,
        processor: Option<Box<dyn Processor>>,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let node = Arc::new(GraphNode::new(NodeInit {
            id,
            graph: self.id,
            kind,
            name,
            ports,
            processor,
            midi_capacity: self.settings.midi_event_capacity,
            retry_limit: self.settings.retry_limit,
        }));
        if self.prepared {
            prepare_node(&node, &self.settings, self.id, &mut self.events);
        }
        self.nodes.insert(id, node);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {kind:?} node {id}");
        self.events.push(GraphEvent::NodeAdded(id));
        self.publish();
        id
    }

    /// Removes a node and every connection touching it.
    ///
    /// The node is suspended before the new topology is published, so a
    /// renderer still holding the old plan renders it as silence.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        node.suspend(true);

        let touching: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.involves(id))
            .copied()
            .collect();
        for connection in touching {
            self.connections.remove(&connection);
            self.events.push(GraphEvent::ConnectionRemoved(connection));
        }
        let Some(node) = self.nodes.remove(&id) else {
            return Err(GraphError::UnknownNode(id));
        };
        self.sub_graphs.remove(&id);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id}");
        self.events.push(GraphEvent::NodeRemoved(id));
        self.publish();
        node.unprepare();
        Ok(())
    }

    /// Removes every node and connection.
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            // Ids come from the map itself.
            let _ = self.remove_node(id);
        }
    }

    /// Sets a node's oversampling factor, re-preparing it when the graph is prepared.
    pub fn set_oversampling(&mut self, id: NodeId, factor: OversampleFactor) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        node.set_oversampling(factor)?;
        if self.prepared {
            if let Some(inner) = self.sub_graphs.get_mut(&id) {
                let ratio = factor.factor();
                inner.prepare_to_play(
                    self.settings.sample_rate * ratio as f64,
                    self.settings.block_size * ratio,
                );
            }
            prepare_node(node, &self.settings, self.id, &mut self.events);
        }
        Ok(())
    }

    // ── Connections ──

    /// Checks whether a connection would be accepted, without adding it.
    pub fn can_connect(
        &self,
        source: NodeId,
        source_port: u32,
        dest: NodeId,
        dest_port: u32,
    ) -> Result<(), GraphError> {
        self.validate(&Connection::new(source, source_port, dest, dest_port))
    }

    fn validate(&self, c: &Connection) -> Result<(), GraphError> {
        let src = self.nodes.get(&c.source).ok_or(GraphError::UnknownNode(c.source))?;
        let dst = self.nodes.get(&c.dest).ok_or(GraphError::UnknownNode(c.dest))?;
        if c.source == c.dest {
            return Err(GraphError::SelfConnection(c.source));
        }
        let out_port = src
            .ports()
            .get(c.source_port)
            .filter(|p| !p.is_input)
            .ok_or(GraphError::InvalidPort {
                node: c.source,
                port: c.source_port,
            })?;
        let in_port = dst
            .ports()
            .get(c.dest_port)
            .filter(|p| p.is_input)
            .ok_or(GraphError::InvalidPort {
                node: c.dest,
                port: c.dest_port,
            })?;
        if !out_port.port_type.can_connect(in_port.port_type) {
            return Err(GraphError::IncompatiblePortType {
                output: out_port.port_type,
                input: in_port.port_type,
            });
        }
        if self.connections.contains(c) {
            return Err(GraphError::DuplicateConnection(*c));
        }
        if self.topology.load().arc_table().is_an_input_to(c.dest, c.source) {
            return Err(GraphError::CycleDetected(*c));
        }
        Ok(())
    }

    /// Connects an output port to an input port.
    pub fn add_connection(
        &mut self,
        source: NodeId,
        source_port: u32,
        dest: NodeId,
        dest_port: u32,
    ) -> Result<Connection, GraphError> {
        let connection = Connection::new(source, source_port, dest, dest_port);
        self.validate(&connection)?;
        self.connections.insert(connection);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {connection}");
        self.events.push(GraphEvent::ConnectionAdded(connection));
        self.publish();
        Ok(connection)
    }

    /// Removes a connection. Returns `false` (and changes nothing) if absent.
    pub fn remove_connection(
        &mut self,
        source: NodeId,
        source_port: u32,
        dest: NodeId,
        dest_port: u32,
    ) -> bool {
        let connection = Connection::new(source, source_port, dest, dest_port);
        if !self.connections.remove(&connection) {
            return false;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {connection}");
        self.events.push(GraphEvent::ConnectionRemoved(connection));
        self.publish();
        true
    }

    /// True if any connection runs directly from `source` to `dest`.
    pub fn is_connected(&self, source: NodeId, dest: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.source == source && c.dest == dest)
    }

    // ── Queries ──

    /// Resident nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<GraphNode>> {
        self.nodes.values()
    }

    /// A resident node.
    pub fn node(&self, id: NodeId) -> Option<&Arc<GraphNode>> {
        self.nodes.get(&id)
    }

    /// Number of resident nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connections in ascending order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections touching `id`.
    pub fn connections_for(&self, id: NodeId) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|c| c.involves(id))
            .copied()
            .collect()
    }

    /// Current render order.
    pub fn render_order(&self) -> Vec<NodeId> {
        self.topology.load().render_order().to_vec()
    }

    /// Current topology snapshot.
    pub fn topology(&self) -> Arc<Topology> {
        self.topology.load_full()
    }

    /// Generation of the latest published topology.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation the renderer is currently playing.
    pub fn active_generation(&self) -> u64 {
        self.shared
            .active_generation
            .load(core::sync::atomic::Ordering::Acquire)
    }

    /// Longest accumulated latency along any path, in frames.
    pub fn total_latency(&self) -> usize {
        let topology = self.topology.load();
        let mut reached: BTreeMap<NodeId, usize> = BTreeMap::new();
        for &id in topology.render_order() {
            let upstream = topology
                .arc_table()
                .direct_sources(id)
                .iter()
                .filter_map(|s| reached.get(s))
                .max()
                .copied()
                .unwrap_or(0);
            let own = self.nodes.get(&id).map_or(0, |n| n.latency_samples());
            reached.insert(id, upstream + own);
        }
        reached.into_values().max().unwrap_or(0)
    }

    /// A nested graph.
    pub fn sub_graph(&self, id: NodeId) -> Option<&GraphProcessor> {
        self.sub_graphs.get(&id)
    }

    /// A nested graph, for editing.
    pub fn sub_graph_mut(&mut self, id: NodeId) -> Option<&mut GraphProcessor> {
        self.sub_graphs.get_mut(&id)
    }

    /// Counters published by the renderer so far.
    pub fn render_stats(&self) -> RenderStats {
        *self.shared.stats.lock()
    }

    // ── Events ──

    /// Drains queued events without dispatching them.
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        self.events.take()
    }

    /// Registers a listener for [`dispatch_events`](Self::dispatch_events).
    pub fn subscribe(&mut self, listener: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.events.subscribe(Box::new(listener))
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Delivers queued events to every listener, in order. Returns how many were delivered.
    pub fn dispatch_events(&mut self) -> usize {
        self.events.dispatch()
    }

    // ── Plan delivery ──

    /// Frees plans the renderer has returned and retries a plan that did not fit the queue.
    pub fn poll(&mut self) -> Result<(), GraphError> {
        while self.retired.pop().is_ok() {}
        if let Some(plan) = self.pending_plan.take() {
            if let Err(rtrb::PushError::Full(plan)) = self.plan_tx.push(plan) {
                self.pending_plan = Some(plan);
                return Err(GraphError::PlanQueueFull);
            }
        }
        Ok(())
    }

    fn publish(&mut self) {
        self.generation += 1;
        let topology = Arc::new(Topology::build(
            self.generation,
            self.nodes.keys().copied(),
            self.connections.iter().copied(),
        ));
        if self.prepared {
            let plan = RenderPlan::build(&topology, &self.nodes, self.settings.block_size);
            self.send_plan(plan);
        }
        self.topology.store(topology);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_publish: generation {}", self.generation);
        self.events.push(GraphEvent::TopologyChanged {
            generation: self.generation,
        });
    }

    fn send_plan(&mut self, plan: RenderPlan) {
        self.pending_plan = Some(plan);
        if self.poll().is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("graph_publish: plan queue full, generation {} held", self.generation);
        }
    }
}

fn prepare_node(node: &GraphNode, settings: &GraphSettings, graph: GraphId, events: &mut EventQueue) {
    match node.prepare(settings.sample_rate, settings.block_size, graph) {
        Ok(()) => events.push(GraphEvent::NodePrepared(node.id())),
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("graph_prepare: node {} failed: {err}", node.id());
            events.push(GraphEvent::PrepareFailed {
                node: node.id(),
                reason: err.reason,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::processor::{PrepareError, ProcessBlock};

    struct Pass {
        ports: PortCount,
        fail: bool,
    }

    impl Pass {
        fn audio(inputs: u32, outputs: u32) -> Box<Self> {
            Box::new(Self {
                ports: PortCount::new().with(PortType::Audio, inputs, outputs),
                fail: false,
            })
        }
    }

    impl Processor for Pass {
        fn name(&self) -> &str {
            "pass"
        }
        fn ports(&self, _: f64, _: usize) -> PortCount {
            self.ports
        }
        fn prepare(&mut self, _: f64, _: usize) -> Result<(), PrepareError> {
            if self.fail {
                Err(PrepareError::new("no"))
            } else {
                Ok(())
            }
        }
        fn process(&mut self, block: &mut ProcessBlock<'_>) {
            let channels = block.audio_in.channels().min(block.audio_out.channels());
            for ch in 0..channels {
                block.pass_through(ch);
            }
        }
    }

    fn graph() -> GraphProcessor {
        GraphProcessor::new(GraphSettings::default()).0
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut g = graph();
        let a = g.add_node(Pass::audio(0, 2));
        let b = g.add_node(Pass::audio(2, 2));
        g.remove_node(b).unwrap();
        let c = g.add_node(Pass::audio(2, 2));
        assert!(a < b && b < c);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn validation_order() {
        let mut g = graph();
        let a = g.add_node(Pass::audio(2, 2));
        let b = g.add_node(Pass::audio(2, 2));
        let midi = g.add_io_node(NodeKind::MidiInput).unwrap();
        let ghost = NodeId(99);

        assert_eq!(g.can_connect(ghost, 0, a, 0), Err(GraphError::UnknownNode(ghost)));
        assert_eq!(g.can_connect(a, 2, a, 0), Err(GraphError::SelfConnection(a)));
        assert_eq!(
            g.can_connect(a, 9, b, 0),
            Err(GraphError::InvalidPort { node: a, port: 9 })
        );
        // port 0 of `a` is an input
        assert_eq!(
            g.can_connect(a, 0, b, 0),
            Err(GraphError::InvalidPort { node: a, port: 0 })
        );
        assert_eq!(
            g.can_connect(midi, 0, b, 0),
            Err(GraphError::IncompatiblePortType {
                output: PortType::Midi,
                input: PortType::Audio,
            })
        );
        let c = g.add_connection(a, 2, b, 0).unwrap();
        assert_eq!(g.add_connection(a, 2, b, 0), Err(GraphError::DuplicateConnection(c)));
        let back = Connection::new(b, 2, a, 0);
        assert_eq!(g.add_connection(b, 2, a, 0), Err(GraphError::CycleDetected(back)));
    }

    #[test]
    fn remove_connection_is_noop_when_absent() {
        let mut g = graph();
        let a = g.add_node(Pass::audio(0, 1));
        let b = g.add_node(Pass::audio(1, 0));
        let before = g.generation();
        assert!(!g.remove_connection(a, 0, b, 0));
        assert_eq!(g.generation(), before);
        g.add_connection(a, 0, b, 0).unwrap();
        assert!(g.is_connected(a, b));
        assert!(g.remove_connection(a, 0, b, 0));
        assert!(!g.is_connected(a, b));
    }

    #[test]
    fn events_follow_mutations() {
        let mut g = graph();
        let a = g.add_node(Pass::audio(0, 1));
        let b = g.add_node(Pass::audio(1, 0));
        let c = g.add_connection(a, 0, b, 0).unwrap();
        g.take_events();
        g.remove_node(a).unwrap();
        let events = g.take_events();
        assert_eq!(events[0], GraphEvent::ConnectionRemoved(c));
        assert_eq!(events[1], GraphEvent::NodeRemoved(a));
        assert!(matches!(events[2], GraphEvent::TopologyChanged { .. }));
    }

    #[test]
    fn prepare_failure_keeps_node_resident() {
        let mut g = graph();
        let bad = g.add_node(Box::new(Pass {
            ports: PortCount::new().with(PortType::Audio, 1, 1),
            fail: true,
        }));
        g.prepare_to_play(44_100.0, 128);
        assert_eq!(g.state(), ProcessingState::Prepared);
        assert!(g.node(bad).is_some_and(|n| n.has_failed()));
        assert!(g.take_events().contains(&GraphEvent::PrepareFailed {
            node: bad,
            reason: "no".into(),
        }));
    }

    #[test]
    fn release_returns_to_idle() {
        let mut g = graph();
        let a = g.add_node(Pass::audio(1, 1));
        g.prepare_to_play(48_000.0, 64);
        assert!(g.node(a).is_some_and(|n| n.is_prepared()));
        g.release_resources();
        assert_eq!(g.state(), ProcessingState::Idle);
        assert!(g.node(a).is_some_and(|n| !n.is_prepared()));
        assert_eq!(g.take_events().last(), Some(&GraphEvent::Released));
    }

    #[test]
    fn nodes_added_while_prepared_are_prepared() {
        let mut g = graph();
        g.prepare_to_play(48_000.0, 64);
        let a = g.add_node(Pass::audio(1, 1));
        assert!(g.node(a).is_some_and(|n| n.is_prepared()));
    }

    #[test]
    fn unknown_type_without_factory() {
        let mut g = graph();
        assert_eq!(
            g.add_node_of_type("volume"),
            Err(GraphError::UnknownNodeType("volume".into()))
        );
        assert!(g.add_io_node(NodeKind::Processor).is_err());
    }

    #[test]
    fn full_plan_queue_holds_latest_plan() {
        let settings = GraphSettings {
            plan_queue_capacity: 1,
            ..GraphSettings::default()
        };
        let (mut g, _renderer) = GraphProcessor::new(settings);
        g.prepare_to_play(48_000.0, 32);
        g.add_node(Pass::audio(1, 1));
        assert_eq!(g.poll(), Err(GraphError::PlanQueueFull));
    }

    #[test]
    fn clear_removes_everything() {
        let mut g = graph();
        let a = g.add_node(Pass::audio(0, 1));
        let b = g.add_node(Pass::audio(1, 0));
        g.add_connection(a, 0, b, 0).unwrap();
        g.clear();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.connections().count(), 0);
        assert!(g.render_order().is_empty());
    }

    #[test]
    fn sub_graph_is_reachable_and_prepared() {
        let mut g = graph();
        g.prepare_to_play(48_000.0, 64);
        let sub = g.add_sub_graph(GraphSettings::default());
        assert!(g.node(sub).is_some_and(|n| n.is_sub_graph() && n.is_prepared()));
        let inner = g.sub_graph_mut(sub).unwrap();
        assert_eq!(inner.state(), ProcessingState::Prepared);
        inner.add_io_node(NodeKind::AudioInput).unwrap();
        assert_eq!(g.sub_graph(sub).map(GraphProcessor::node_count), Some(1));
        g.remove_node(sub).unwrap();
        assert!(g.sub_graph(sub).is_none());
    }
}
