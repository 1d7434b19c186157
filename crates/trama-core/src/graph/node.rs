//! Graph nodes: identity, real-time parameter state, metering.
//!
//! A [`GraphNode`] is shared between the control thread (which owns the graph's
//! arena) and the render plans built from it. Everything the render thread
//! touches is atomic or behind a lock it only ever `try_lock`s.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::atomic::{AtomicValue, Contention};
use crate::oversample::{OversampleFactor, Oversampler};
use crate::port::{PortCount, PortList, PortType};

use super::buffer::{AudioBuffer, MidiBuffer};
use super::processor::{PrepareError, Processor};

/// Identifier of a node, unique within its graph and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Identifier of a graph instance, used to check node ownership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphId(pub(crate) u32);

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

impl GraphId {
    pub(crate) fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Built-in behaviour of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Exposes the host's audio inputs as outputs.
    AudioInput,
    /// Sends its inputs to the host's audio outputs.
    AudioOutput,
    /// Exposes the host's MIDI input as an output.
    MidiInput,
    /// Sends its MIDI input to the host.
    MidiOutput,
    /// Hosts a nested graph.
    SubGraph,
    /// Hosts a [`Processor`].
    Processor,
}

impl NodeKind {
    /// True for the four host I/O shims.
    pub fn is_io(self) -> bool {
        matches!(
            self,
            NodeKind::AudioInput | NodeKind::AudioOutput | NodeKind::MidiInput | NodeKind::MidiOutput
        )
    }

    /// Default display name.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::AudioInput => "Audio Input",
            NodeKind::AudioOutput => "Audio Output",
            NodeKind::MidiInput => "MIDI Input",
            NodeKind::MidiOutput => "MIDI Output",
            NodeKind::SubGraph => "Graph",
            NodeKind::Processor => "Processor",
        }
    }
}

/// A user property value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Free text.
    Text(String),
    /// Number.
    Number(f64),
    /// Flag.
    Flag(bool),
}

/// Gain ramps for one block, from the previous block's targets to the current ones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GainRamp {
    /// Output gain at block start.
    pub from: f32,
    /// Output gain at block end.
    pub to: f32,
    /// Input gain at block start.
    pub input_from: f32,
    /// Input gain at block end.
    pub input_to: f32,
}

impl Default for GainRamp {
    fn default() -> Self {
        Self {
            from: 1.0,
            to: 1.0,
            input_from: 1.0,
            input_to: 1.0,
        }
    }
}

/// Which per-step buffer a port lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lane {
    Signal,
    Control,
    Midi,
    Unrouted,
}

/// Port index to buffer slot mapping.
#[derive(Clone, Debug, Default)]
pub(crate) struct PortLayout {
    slots: Vec<(Lane, usize)>,
    pub signal_in: usize,
    pub signal_out: usize,
    pub control_in: usize,
    pub control_out: usize,
    pub midi_in: usize,
    pub midi_out: usize,
    /// Signal-input slots holding Audio ports, in channel order.
    pub audio_in: Vec<usize>,
    /// Signal-output slots holding Audio ports, in channel order.
    pub audio_out: Vec<usize>,
}

impl PortLayout {
    fn new(ports: &PortList) -> Self {
        let mut layout = Self::default();
        for port in ports {
            let counter = match (port.port_type, port.is_input) {
                (PortType::Audio | PortType::Cv, true) => Some((Lane::Signal, &mut layout.signal_in)),
                (PortType::Audio | PortType::Cv, false) => {
                    Some((Lane::Signal, &mut layout.signal_out))
                }
                (PortType::Control, true) => Some((Lane::Control, &mut layout.control_in)),
                (PortType::Control, false) => Some((Lane::Control, &mut layout.control_out)),
                (PortType::Midi, true) => Some((Lane::Midi, &mut layout.midi_in)),
                (PortType::Midi, false) => Some((Lane::Midi, &mut layout.midi_out)),
                (PortType::Unknown, _) => None,
            };
            let slot = match counter {
                Some((lane, count)) => {
                    *count += 1;
                    (lane, *count - 1)
                }
                None => (Lane::Unrouted, 0),
            };
            if port.port_type == PortType::Audio {
                if port.is_input {
                    layout.audio_in.push(slot.1);
                } else {
                    layout.audio_out.push(slot.1);
                }
            }
            layout.slots.push(slot);
        }
        layout
    }

    pub(crate) fn slot(&self, port: u32) -> (Lane, usize) {
        self.slots
            .get(port as usize)
            .copied()
            .unwrap_or((Lane::Unrouted, 0))
    }
}

/// High-rate buffers for an oversampled node.
pub(crate) struct OversampleState {
    pub oversampler: Oversampler,
    pub audio_in: AudioBuffer,
    pub audio_out: AudioBuffer,
    pub midi_in: Vec<MidiBuffer>,
}

/// Render-side body of a processor node.
pub(crate) struct NodeBody {
    pub processor: Box<dyn Processor>,
    pub oversampling: Option<OversampleState>,
    /// Base-rate frames the processor (and oversampling buffers) accept; 0 when unprepared.
    pub block_size: usize,
}

/// One node of a graph.
pub struct GraphNode {
    id: NodeId,
    graph: GraphId,
    kind: NodeKind,
    ports: PortList,
    layout: PortLayout,
    midi_capacity: usize,
    retry_limit: u32,
    name: RwLock<String>,
    properties: RwLock<BTreeMap<String, PropertyValue>>,
    body: Mutex<Option<NodeBody>>,
    gain: AtomicValue<f32>,
    last_gain: AtomicValue<f32>,
    input_gain: AtomicValue<f32>,
    last_input_gain: AtomicValue<f32>,
    input_rms: Box<[AtomicValue<f32>]>,
    output_rms: Box<[AtomicValue<f32>]>,
    latency: AtomicValue<usize>,
    oversampling: AtomicValue<usize>,
    prepared: AtomicBool,
    failed: AtomicBool,
    suspended: AtomicBool,
    muted: AtomicBool,
    enabled: AtomicBool,
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &*self.name.read())
            .field("ports", &self.ports.len())
            .field("prepared", &self.is_prepared())
            .finish_non_exhaustive()
    }
}

/// Node construction parameters, filled in by the graph.
pub(crate) struct NodeInit {
    pub id: NodeId,
    pub graph: GraphId,
    pub kind: NodeKind,
    pub name: String,
    pub ports: PortCount,
    pub processor: Option<Box<dyn Processor>>,
    pub midi_capacity: usize,
    pub retry_limit: u32,
}

impl GraphNode {
    pub(crate) fn new(init: NodeInit) -> Self {
        let ports = init.ports.to_port_list();
        let layout = PortLayout::new(&ports);
        let meters = |n: usize| (0..n).map(|_| AtomicValue::new(0.0)).collect::<Box<[_]>>();
        Self {
            id: init.id,
            graph: init.graph,
            kind: init.kind,
            input_rms: meters(layout.audio_in.len()),
            output_rms: meters(layout.audio_out.len()),
            ports,
            layout,
            midi_capacity: init.midi_capacity,
            retry_limit: init.retry_limit,
            name: RwLock::new(init.name),
            properties: RwLock::new(BTreeMap::new()),
            body: Mutex::new(init.processor.map(|processor| NodeBody {
                processor,
                oversampling: None,
                block_size: 0,
            })),
            gain: AtomicValue::new(1.0),
            last_gain: AtomicValue::new(1.0),
            input_gain: AtomicValue::new(1.0),
            last_input_gain: AtomicValue::new(1.0),
            latency: AtomicValue::new(0),
            oversampling: AtomicValue::new(1),
            prepared: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        }
    }

    // ── Identity ──

    /// Node id.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Graph this node belongs to.
    pub fn graph_id(&self) -> GraphId {
        self.graph
    }

    /// Built-in behaviour.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// True if the node hosts a nested graph.
    pub fn is_sub_graph(&self) -> bool {
        self.kind == NodeKind::SubGraph
    }

    /// Ordered ports.
    pub fn ports(&self) -> &PortList {
        &self.ports
    }

    pub(crate) fn layout(&self) -> &PortLayout {
        &self.layout
    }

    pub(crate) fn midi_capacity(&self) -> usize {
        self.midi_capacity
    }

    /// Display name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Renames the node.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    // ── Properties ──

    /// A user property.
    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        self.properties.read().get(key).cloned()
    }

    /// Sets a user property, returning the previous value.
    pub fn set_property(&self, key: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.properties.write().insert(key.into(), value)
    }

    /// Removes a user property.
    pub fn remove_property(&self, key: &str) -> Option<PropertyValue> {
        self.properties.write().remove(key)
    }

    /// All user properties, sorted by key.
    pub fn properties(&self) -> Vec<(String, PropertyValue)> {
        self.properties
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ── Lifecycle ──

    /// Prepares the processor for a rate and block size.
    ///
    /// Re-preparing releases the previous state first. On failure the node is
    /// marked failed and renders silence.
    pub fn prepare(
        &self,
        sample_rate: f64,
        block_size: usize,
        owner: GraphId,
    ) -> Result<(), PrepareError> {
        debug_assert_eq!(owner, self.graph, "node {} prepared by a foreign graph", self.id);
        let factor = OversampleFactor::from_factor(self.oversampling.get()).unwrap_or_default();
        let mut body = self.body.lock();
        if let Some(body) = body.as_mut() {
            if self.prepared.swap(false, Ordering::AcqRel) {
                body.processor.release();
            }
            body.block_size = 0;
            let ratio = factor.factor();
            if let Err(err) = body
                .processor
                .prepare(sample_rate * ratio as f64, block_size * ratio)
            {
                body.oversampling = None;
                self.failed.store(true, Ordering::Release);
                return Err(err);
            }
            body.oversampling = (ratio > 1).then(|| OversampleState {
                oversampler: Oversampler::new(factor, self.layout.signal_in, self.layout.signal_out),
                audio_in: AudioBuffer::new(self.layout.signal_in, block_size * ratio),
                audio_out: AudioBuffer::new(self.layout.signal_out, block_size * ratio),
                midi_in: vec![MidiBuffer::with_capacity(self.midi_capacity); self.layout.midi_in],
            });
            body.block_size = block_size;
            let latency = body.processor.latency_samples().div_ceil(ratio) + factor.latency_samples();
            self.latency.set(latency);
        }
        self.last_gain.set(self.gain.get());
        self.last_input_gain.set(self.input_gain.get());
        self.failed.store(false, Ordering::Release);
        self.prepared.store(true, Ordering::Release);
        Ok(())
    }

    /// Releases processor resources. No-op if not prepared.
    pub fn unprepare(&self) {
        if !self.prepared.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut body = self.body.lock();
        if let Some(body) = body.as_mut() {
            body.processor.release();
            body.oversampling = None;
            body.block_size = 0;
        }
        for meter in self.input_rms.iter().chain(self.output_rms.iter()) {
            meter.set(0.0);
        }
    }

    /// Suspends or resumes the node. A suspended node renders silence.
    pub fn suspend(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Release);
        if let Some(body) = self.body.lock().as_mut() {
            body.processor.set_suspended(suspended);
        }
    }

    /// True once prepared and until unprepared.
    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::Acquire)
    }

    /// True when the last prepare failed.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// True while suspended.
    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Latency in frames at the graph rate, including oversampling.
    pub fn latency_samples(&self) -> usize {
        self.latency.get()
    }

    // ── Oversampling, mute, enable ──

    /// Selects the oversampling factor used from the next prepare on.
    pub fn set_oversampling(&self, factor: OversampleFactor) -> Result<(), Contention> {
        self.oversampling
            .set_with_retry(factor.factor(), self.retry_limit)
    }

    /// Requested oversampling factor.
    pub fn oversampling(&self) -> OversampleFactor {
        OversampleFactor::from_factor(self.oversampling.get()).unwrap_or_default()
    }

    /// Mutes the node's audio outputs with a short ramp.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    /// True while muted.
    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Enables or disables processing. A disabled node outputs silence.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// True unless disabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    // ── Gain ──

    /// Publishes a new output gain target (linear).
    pub fn set_gain(&self, gain: f32) -> Result<(), Contention> {
        self.gain.set_with_retry(gain, self.retry_limit)
    }

    /// Output gain target.
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Publishes a new input gain target (linear).
    pub fn set_input_gain(&self, gain: f32) -> Result<(), Contention> {
        self.input_gain.set_with_retry(gain, self.retry_limit)
    }

    /// Input gain target.
    pub fn input_gain(&self) -> f32 {
        self.input_gain.get()
    }

    /// Output gain reached at the end of the last rendered block.
    pub fn last_gain(&self) -> f32 {
        self.last_gain.get()
    }

    /// Input gain reached at the end of the last rendered block.
    pub fn last_input_gain(&self) -> f32 {
        self.last_input_gain.get()
    }

    /// Snapshots the gain targets for this block. Render thread, once per block.
    pub fn update_gain(&self) -> GainRamp {
        debug_assert!(self.is_prepared(), "update_gain on unprepared node {}", self.id);
        if !self.is_prepared() {
            return GainRamp::default();
        }
        let ramp = GainRamp {
            from: self.last_gain.get(),
            to: self.gain.get(),
            input_from: self.last_input_gain.get(),
            input_to: self.input_gain.get(),
        };
        self.last_gain.set(ramp.to);
        self.last_input_gain.set(ramp.input_to);
        ramp
    }

    // ── Metering ──

    /// Number of metered audio input channels.
    pub fn num_audio_inputs(&self) -> usize {
        self.input_rms.len()
    }

    /// Number of metered audio output channels.
    pub fn num_audio_outputs(&self) -> usize {
        self.output_rms.len()
    }

    /// Publishes an input level. Render thread.
    pub fn set_input_rms(&self, channel: usize, value: f32) {
        debug_assert!(self.is_prepared(), "metering unprepared node {}", self.id);
        if let Some(meter) = self.input_rms.get(channel) {
            meter.set(value);
        }
    }

    /// Publishes an output level. Render thread.
    pub fn set_output_rms(&self, channel: usize, value: f32) {
        debug_assert!(self.is_prepared(), "metering unprepared node {}", self.id);
        if let Some(meter) = self.output_rms.get(channel) {
            meter.set(value);
        }
    }

    /// Last published input level; zero when out of range.
    pub fn input_rms(&self, channel: usize) -> f32 {
        self.input_rms.get(channel).map_or(0.0, AtomicValue::get)
    }

    /// Last published output level; zero when out of range.
    pub fn output_rms(&self, channel: usize) -> f32 {
        self.output_rms.get(channel).map_or(0.0, AtomicValue::get)
    }

    // ── Processor access ──

    /// Runs `f` on the hosted processor. Control thread; may wait for one
    /// render block.
    pub fn with_processor<R>(&self, f: impl FnOnce(&mut dyn Processor) -> R) -> Option<R> {
        let mut body = self.body.lock();
        body.as_mut().map(|b| f(b.processor.as_mut()))
    }

    /// Sets a processor parameter. Returns `false` if the processor has none at `index`.
    pub fn set_parameter(&self, index: usize, value: f32) -> bool {
        self.with_processor(|p| p.set_parameter(index, value))
            .unwrap_or(false)
    }

    /// Reads a processor parameter.
    pub fn parameter(&self, index: usize) -> Option<f32> {
        self.with_processor(|p| p.parameter(index)).flatten()
    }

    pub(crate) fn try_body(&self) -> Option<MutexGuard<'_, Option<NodeBody>>> {
        self.body.try_lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::processor::ProcessBlock;
    use crate::port::PortType;

    struct Stub {
        fail: bool,
        latency: usize,
        prepared_at: Option<(f64, usize)>,
    }

    impl Processor for Stub {
        fn name(&self) -> &str {
            "stub"
        }
        fn ports(&self, _: f64, _: usize) -> PortCount {
            PortCount::new().with(PortType::Audio, 2, 2)
        }
        fn prepare(&mut self, sample_rate: f64, block_size: usize) -> Result<(), PrepareError> {
            if self.fail {
                return Err(PrepareError::new("unsupported rate"));
            }
            self.prepared_at = Some((sample_rate, block_size));
            Ok(())
        }
        fn process(&mut self, _: &mut ProcessBlock<'_>) {}
        fn latency_samples(&self) -> usize {
            self.latency
        }
    }

    fn node(fail: bool) -> (GraphNode, GraphId) {
        let graph = GraphId::next();
        let node = GraphNode::new(NodeInit {
            id: NodeId(1),
            graph,
            kind: NodeKind::Processor,
            name: "stub".into(),
            ports: PortCount::new().with(PortType::Audio, 2, 2),
            processor: Some(Box::new(Stub {
                fail,
                latency: 8,
                prepared_at: None,
            })),
            midi_capacity: 16,
            retry_limit: 64,
        });
        (node, graph)
    }

    #[test]
    fn prepare_and_unprepare() {
        let (node, graph) = node(false);
        assert!(!node.is_prepared());
        node.prepare(48000.0, 256, graph).unwrap();
        assert!(node.is_prepared());
        assert_eq!(node.latency_samples(), 8);
        node.unprepare();
        assert!(!node.is_prepared());
    }

    #[test]
    fn failed_prepare_marks_node() {
        let (node, graph) = node(true);
        let err = node.prepare(48000.0, 256, graph).unwrap_err();
        assert_eq!(err.reason, "unsupported rate");
        assert!(node.has_failed());
        assert!(!node.is_prepared());
    }

    #[test]
    fn oversampled_prepare_scales_rate_and_latency() {
        let (node, graph) = node(false);
        node.set_oversampling(OversampleFactor::X4).unwrap();
        node.prepare(48000.0, 128, graph).unwrap();
        assert!(
            node.body
                .lock()
                .as_ref()
                .is_some_and(|b| b.oversampling.is_some())
        );
        assert_eq!(node.latency_samples(), 2 + OversampleFactor::X4.latency_samples());
    }

    #[test]
    fn update_gain_snapshots_targets() {
        let (node, graph) = node(false);
        node.prepare(48000.0, 64, graph).unwrap();
        node.set_gain(0.5).unwrap();
        node.set_input_gain(2.0).unwrap();
        let ramp = node.update_gain();
        assert_eq!(ramp.from, 1.0);
        assert_eq!(ramp.to, 0.5);
        assert_eq!(ramp.input_from, 1.0);
        assert_eq!(ramp.input_to, 2.0);
        assert_eq!(node.last_gain(), 0.5);

        let steady = node.update_gain();
        assert_eq!((steady.from, steady.to), (0.5, 0.5));
    }

    #[test]
    fn meters_per_audio_channel() {
        let (node, graph) = node(false);
        node.prepare(48000.0, 64, graph).unwrap();
        assert_eq!(node.num_audio_inputs(), 2);
        node.set_input_rms(1, 0.25);
        node.set_output_rms(0, 0.75);
        node.set_output_rms(9, 1.0);
        assert_eq!(node.input_rms(1), 0.25);
        assert_eq!(node.output_rms(0), 0.75);
        assert_eq!(node.output_rms(9), 0.0);
        node.unprepare();
        assert_eq!(node.output_rms(0), 0.0);
    }

    #[test]
    fn unprepared_reads_return_defaults() {
        let (node, _) = node(false);
        assert_eq!(node.input_rms(0), 0.0);
        assert!(!node.is_sub_graph());
        assert_eq!(node.latency_samples(), 0);
    }

    #[test]
    fn properties_and_name() {
        let (node, _) = node(false);
        node.set_name("Lead");
        assert_eq!(node.name(), "Lead");
        assert!(node.set_property("color", PropertyValue::Text("red".into())).is_none());
        node.set_property("bpm-sync", PropertyValue::Flag(true));
        assert_eq!(node.property("color"), Some(PropertyValue::Text("red".into())));
        assert_eq!(node.properties().len(), 2);
        assert!(node.remove_property("color").is_some());
        assert!(node.property("color").is_none());
    }

    #[test]
    fn layout_maps_ports_to_lanes() {
        let ports = PortCount::new()
            .with(PortType::Control, 1, 0)
            .with(PortType::Audio, 1, 1)
            .with(PortType::Cv, 1, 0)
            .with(PortType::Midi, 1, 0)
            .to_port_list();
        let layout = PortLayout::new(&ports);
        assert_eq!(layout.slot(0), (Lane::Control, 0));
        assert_eq!(layout.slot(1), (Lane::Signal, 0));
        assert_eq!(layout.slot(2), (Lane::Signal, 0));
        assert_eq!(layout.slot(3), (Lane::Signal, 1));
        assert_eq!(layout.slot(4), (Lane::Midi, 0));
        assert_eq!(layout.slot(99), (Lane::Unrouted, 0));
        assert_eq!(layout.signal_in, 2);
        assert_eq!(layout.audio_in, [0]);
    }
}
