//! Integration tests for trama-core.
//!
//! Exercises the graph, renderer and transport together: chain scenarios,
//! cycle rejection, mid-graph removal, cross-thread value handoff, gain ramps,
//! mute, oversampling and nested graphs, all through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use trama_core::{
    AtomicValue, AudioBuffer, GraphError, GraphEvent, GraphProcessor, GraphSettings, HostIo,
    MidiBuffer, NodeId, NodeKind, OversampleFactor, PortCount, PortType, PrepareError,
    ProcessBlock, Processor, ProcessingState, Renderer, TimeInfo, Transport, TransportSettings,
};

const BLOCK: usize = 64;

// ============================================================================
// Test processors
// ============================================================================

/// Copies each audio input to the matching output.
struct Thru {
    inputs: u32,
    outputs: u32,
}

impl Processor for Thru {
    fn name(&self) -> &str {
        "Thru"
    }

    fn ports(&self, _: f64, _: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, self.inputs, self.outputs)
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let channels = block.audio_in.channels().min(block.audio_out.channels());
        for ch in 0..channels {
            block.pass_through(ch);
        }
    }
}

fn thru(inputs: u32, outputs: u32) -> Box<Thru> {
    Box::new(Thru { inputs, outputs })
}

/// Writes a constant to every audio output.
struct Dc(f32);

impl Processor for Dc {
    fn name(&self) -> &str {
        "DC"
    }

    fn ports(&self, _: f64, _: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, 0, 2)
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        for ch in 0..block.audio_out.channels() {
            block.output(ch).fill(self.0);
        }
    }
}

/// Reports the frame count and rate it was prepared with.
struct RateProbe {
    seen: Arc<AtomicValue<f64>>,
}

impl Processor for RateProbe {
    fn name(&self) -> &str {
        "Probe"
    }

    fn ports(&self, _: f64, _: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, 1, 1)
    }

    fn prepare(&mut self, sample_rate: f64, _: usize) -> Result<(), PrepareError> {
        self.seen.set(sample_rate);
        Ok(())
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        block.pass_through(0);
    }
}

// ============================================================================
// Host harness
// ============================================================================

struct Host {
    audio_in: AudioBuffer,
    audio_out: AudioBuffer,
    midi_in: MidiBuffer,
    midi_out: MidiBuffer,
    time: TimeInfo,
}

impl Host {
    fn new() -> Self {
        Self {
            audio_in: AudioBuffer::new(2, BLOCK),
            audio_out: AudioBuffer::new(2, BLOCK),
            midi_in: MidiBuffer::with_capacity(32),
            midi_out: MidiBuffer::with_capacity(32),
            time: TimeInfo::default(),
        }
    }

    fn render(&mut self, renderer: &mut Renderer) {
        self.render_frames(renderer, BLOCK);
    }

    fn render_frames(&mut self, renderer: &mut Renderer, frames: usize) {
        let mut io = HostIo {
            audio_in: &self.audio_in,
            audio_out: &mut self.audio_out,
            midi_in: &self.midi_in,
            midi_out: &mut self.midi_out,
        };
        renderer.render(frames, &mut io, &self.time);
    }

    fn out(&self, ch: usize) -> &[f32] {
        self.audio_out.channel(ch)
    }
}

/// DC source -> `middle` -> audio output.
fn dc_chain(level: f32) -> (GraphProcessor, Renderer, NodeId) {
    let (mut graph, renderer) = GraphProcessor::new(GraphSettings::default());
    let src = graph.add_node(Box::new(Dc(level)));
    let mid = graph.add_node(thru(2, 2));
    let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
    graph.add_connection(src, 0, mid, 0).unwrap();
    graph.add_connection(src, 1, mid, 1).unwrap();
    graph.add_connection(mid, 2, out, 0).unwrap();
    graph.add_connection(mid, 3, out, 1).unwrap();
    graph.prepare_to_play(48_000.0, BLOCK);
    (graph, renderer, mid)
}

// ============================================================================
// 1. Scenarios
// ============================================================================

#[test]
fn basic_chain_orders_and_rejects_cycle() {
    let (mut graph, _renderer) = GraphProcessor::new(GraphSettings::default());
    // A needs inputs so that B.out0 -> A.in0 is well-formed and reaches the
    // cycle check. Port indices are global: inputs 0-1, outputs 2-3.
    let a = graph.add_node(thru(2, 2));
    let b = graph.add_node(thru(2, 2));
    graph.add_connection(a, 2, b, 0).unwrap();
    graph.add_connection(a, 3, b, 1).unwrap();
    assert_eq!(graph.render_order(), vec![a, b]);

    let table_before = graph.topology().arc_table().clone();
    let generation = graph.generation();
    let err = graph.add_connection(b, 2, a, 0).unwrap_err();
    assert!(matches!(err, GraphError::CycleDetected(_)));
    assert_eq!(graph.render_order(), vec![a, b]);
    assert_eq!(graph.topology().arc_table(), &table_before);
    assert_eq!(graph.generation(), generation);
}

#[test]
fn removing_middle_node_does_not_rewire() {
    let (mut graph, _renderer) = GraphProcessor::new(GraphSettings::default());
    let a = graph.add_node(thru(0, 1));
    let b = graph.add_node(thru(1, 1));
    let c = graph.add_node(thru(1, 0));
    graph.add_connection(a, 0, b, 0).unwrap();
    graph.add_connection(b, 1, c, 0).unwrap();

    graph.remove_node(b).unwrap();
    assert_eq!(graph.connections().count(), 0);
    assert!(!graph.is_connected(a, c));
    assert!(graph.connections_for(a).is_empty());
    assert!(graph.connections_for(c).is_empty());
    assert_eq!(graph.render_order(), vec![a, c]);
    assert!(
        !graph
            .topology()
            .arc_table()
            .is_an_input_to(a, c)
    );
    assert_eq!(graph.remove_node(b), Err(GraphError::UnknownNode(b)));
}

#[test]
fn arc_table_rebuilt_after_disconnect_allows_reverse_connection() {
    let (mut graph, _renderer) = GraphProcessor::new(GraphSettings::default());
    let a = graph.add_node(thru(1, 1));
    let b = graph.add_node(thru(1, 1));
    graph.add_connection(a, 1, b, 0).unwrap();
    assert!(graph.can_connect(b, 1, a, 0).is_err());
    assert!(graph.remove_connection(a, 1, b, 0));
    graph.add_connection(b, 1, a, 0).unwrap();
    assert_eq!(graph.render_order(), vec![b, a]);
}

// ============================================================================
// 2. Rendering
// ============================================================================

#[test]
fn render_chain_reaches_host_output() {
    let (_graph, mut renderer, _) = dc_chain(0.25);
    let mut host = Host::new();
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.25));
    assert!(host.out(1).iter().all(|&s| s == 0.25));
}

#[test]
fn fan_in_sums_signals() {
    let (mut graph, mut renderer) = GraphProcessor::new(GraphSettings::default());
    let one = graph.add_node(Box::new(Dc(0.25)));
    let two = graph.add_node(Box::new(Dc(0.5)));
    let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
    graph.add_connection(one, 0, out, 0).unwrap();
    graph.add_connection(two, 0, out, 0).unwrap();
    graph.prepare_to_play(48_000.0, BLOCK);

    let mut host = Host::new();
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| (s - 0.75).abs() < 1e-6));
    assert!(host.out(1).iter().all(|&s| s == 0.0));
}

#[test]
fn gain_ramps_once_then_holds() {
    let (graph, mut renderer, mid) = dc_chain(1.0);
    let mut host = Host::new();
    host.render(&mut renderer);

    let node = graph.node(mid).unwrap();
    node.set_gain(0.5).unwrap();
    host.render(&mut renderer);
    let ramp = host.out(0);
    assert!((ramp[0] - 1.0).abs() < 1e-6);
    assert!(ramp[BLOCK - 1] < ramp[0]);
    assert!((ramp[BLOCK - 1] - 0.5).abs() < 0.01);

    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| (s - 0.5).abs() < 1e-6));
    assert!((node.output_rms(0) - 0.5).abs() < 1e-4);
    assert!((node.input_rms(0) - 1.0).abs() < 1e-4);
}

#[test]
fn mute_fades_to_silence() {
    let (graph, mut renderer, mid) = dc_chain(1.0);
    let mut host = Host::new();
    host.render(&mut renderer);

    graph.node(mid).unwrap().set_muted(true);
    host.render(&mut renderer);
    assert!(host.out(0)[0] > 0.9);
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.0));

    graph.node(mid).unwrap().set_muted(false);
    host.render(&mut renderer);
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| (s - 1.0).abs() < 1e-6));
}

#[test]
fn disabled_and_suspended_nodes_render_silence() {
    let (graph, mut renderer, mid) = dc_chain(1.0);
    let mut host = Host::new();
    let node = graph.node(mid).unwrap();

    node.set_enabled(false);
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.0));

    node.set_enabled(true);
    node.suspend(true);
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.0));

    node.suspend(false);
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 1.0));
}

#[test]
fn removal_is_silent_before_and_after_plan_swap() {
    let (mut graph, mut renderer, mid) = dc_chain(1.0);
    let mut host = Host::new();
    host.render(&mut renderer);
    let swaps = graph.render_stats().plan_swaps;

    graph.remove_node(mid).unwrap();
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.0));
    assert_eq!(renderer.generation(), graph.generation());
    assert_eq!(graph.active_generation(), graph.generation());
    assert!(graph.render_stats().plan_swaps > swaps);
    graph.poll().unwrap();
}

#[test]
fn renderer_without_plan_outputs_silence() {
    let (_graph, mut renderer) = GraphProcessor::new(GraphSettings::default());
    let mut host = Host::new();
    host.audio_out.channel_mut(0).fill(1.0);
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.0));
}

#[test]
fn release_stops_rendering() {
    let (mut graph, mut renderer, _) = dc_chain(1.0);
    let mut host = Host::new();
    host.render(&mut renderer);
    assert_eq!(graph.state(), ProcessingState::Rendering);
    assert_eq!(graph.render_stats().blocks, 1);

    graph.release_resources();
    assert_eq!(graph.state(), ProcessingState::Idle);
    for _ in 0..3 {
        host.render(&mut renderer);
        assert!(host.out(0).iter().all(|&s| s == 0.0));
    }
    assert_eq!(renderer.block_size(), 0);
    assert_eq!(graph.render_stats().blocks, 4);
}

#[test]
fn smaller_block_size_while_old_plan_is_queued() {
    let (mut graph, mut renderer) = GraphProcessor::new(GraphSettings {
        plan_queue_capacity: 1,
        ..GraphSettings::default()
    });
    let src = graph.add_node(Box::new(Dc(1.0)));
    let mid = graph.add_node(thru(2, 2));
    let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
    graph.add_connection(src, 0, mid, 0).unwrap();
    graph.add_connection(src, 1, mid, 1).unwrap();
    graph.add_connection(mid, 2, out, 0).unwrap();
    graph.add_connection(mid, 3, out, 1).unwrap();
    graph.set_oversampling(mid, OversampleFactor::X2).unwrap();
    graph.prepare_to_play(48_000.0, BLOCK);

    let mut host = Host::new();
    host.render(&mut renderer);

    // Queues a plan built for BLOCK frames, then re-prepares at half that.
    graph.add_node(thru(2, 2));
    graph.prepare_to_play(48_000.0, BLOCK / 2);
    assert_eq!(graph.poll(), Err(GraphError::PlanQueueFull));

    host.render(&mut renderer);
    assert_eq!(renderer.block_size(), BLOCK);
    assert!(host.out(0).iter().all(|s| s.is_finite()));
    assert!(host.out(0)[BLOCK / 2..].iter().all(|&s| s == 0.0));

    graph.poll().unwrap();
    host.render_frames(&mut renderer, BLOCK / 2);
    assert_eq!(renderer.block_size(), BLOCK / 2);
    assert!(host.out(0)[..BLOCK / 2].iter().all(|s| s.is_finite()));
}

#[test]
fn oversampled_node_is_prepared_at_higher_rate() {
    let (mut graph, mut renderer) = GraphProcessor::new(GraphSettings::default());
    let seen = Arc::new(AtomicValue::new(0.0));
    let src = graph.add_node(Box::new(Dc(1.0)));
    let probe = graph.add_node(Box::new(RateProbe {
        seen: Arc::clone(&seen),
    }));
    let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
    graph.add_connection(src, 0, probe, 0).unwrap();
    graph.add_connection(probe, 1, out, 0).unwrap();
    graph.set_oversampling(probe, OversampleFactor::X2).unwrap();
    graph.prepare_to_play(48_000.0, BLOCK);
    assert_eq!(seen.get(), 96_000.0);
    assert!(graph.total_latency() >= OversampleFactor::X2.latency_samples());

    let mut host = Host::new();
    for _ in 0..4 {
        host.render(&mut renderer);
    }
    assert!((host.out(0)[BLOCK - 1] - 1.0).abs() < 0.05);
}

#[test]
fn nested_graph_renders_inline() {
    let (mut graph, mut renderer) = GraphProcessor::new(GraphSettings::default());
    graph.prepare_to_play(48_000.0, BLOCK);
    let src = graph.add_node(Box::new(Dc(0.5)));
    let sub = graph.add_sub_graph(GraphSettings::default());
    let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
    graph.add_connection(src, 0, sub, 0).unwrap();
    // sub-graph ports: audio in 0-1, audio out 2-3, midi in 4, midi out 5
    let sub_out = graph
        .node(sub)
        .and_then(|n| n.ports().index_of(PortType::Audio, 0, false))
        .unwrap();
    graph.add_connection(sub, sub_out, out, 0).unwrap();

    let inner = graph.sub_graph_mut(sub).unwrap();
    let inner_in = inner.add_io_node(NodeKind::AudioInput).unwrap();
    let inner_out = inner.add_io_node(NodeKind::AudioOutput).unwrap();
    inner.add_connection(inner_in, 0, inner_out, 0).unwrap();

    let mut host = Host::new();
    host.render(&mut renderer);
    assert!(host.out(0).iter().all(|&s| s == 0.5));
}

// ============================================================================
// 3. Events
// ============================================================================

#[test]
fn subscribers_see_events_in_order() {
    let (mut graph, _renderer) = GraphProcessor::new(GraphSettings::default());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    graph.subscribe(move |event| sink.lock().push(event.clone()));

    let a = graph.add_node(thru(0, 1));
    let b = graph.add_node(thru(1, 0));
    let c = graph.add_connection(a, 0, b, 0).unwrap();
    assert_eq!(graph.dispatch_events(), 6);

    let seen = seen.lock();
    assert_eq!(seen[0], GraphEvent::NodeAdded(a));
    assert!(matches!(seen[1], GraphEvent::TopologyChanged { .. }));
    assert_eq!(seen[2], GraphEvent::NodeAdded(b));
    assert_eq!(seen[4], GraphEvent::ConnectionAdded(c));
    assert_eq!(
        seen[5],
        GraphEvent::TopologyChanged {
            generation: graph.generation()
        }
    );
}

// ============================================================================
// 4. Transport and atomics
// ============================================================================

#[test]
fn transport_seek_after_one_cycle() {
    let mut transport = Transport::new(&TransportSettings {
        sample_rate: 48_000.0,
        ..TransportSettings::default()
    });
    let handle = transport.handle();
    handle.request_audio_frame(48_000).unwrap();
    transport.pre_process(BLOCK);
    transport.post_process(BLOCK);
    assert_eq!(handle.monitor().position_frames(), 48_000);
}

#[test]
fn atomic_value_readers_never_go_backwards() {
    const WRITES: u64 = 50_000;
    let value = Arc::new(AtomicValue::new(0_u64));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let value = Arc::clone(&value);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last = 0;
                let mut reads = 0_u64;
                while !done.load(Ordering::Acquire) || reads == 0 {
                    let v = value.get();
                    assert!(v >= last, "observed {v} after {last}");
                    assert!(v <= WRITES, "observed unwritten value {v}");
                    last = v;
                    reads += 1;
                }
                last
            })
        })
        .collect();

    for i in 1..=WRITES {
        value.exchange(i, u32::MAX).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        let last = reader.join().unwrap();
        assert!(last <= WRITES);
    }
    assert_eq!(value.get(), WRITES);
}

#[test]
fn render_thread_and_control_thread_run_concurrently() {
    let (mut graph, mut renderer, mid) = dc_chain(1.0);
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let render = thread::spawn(move || {
        let mut host = Host::new();
        let mut blocks = 0;
        while !flag.load(Ordering::Acquire) {
            host.render(&mut renderer);
            blocks += 1;
        }
        blocks
    });

    let node = Arc::clone(graph.node(mid).unwrap());
    for i in 0..200 {
        node.set_gain((i % 10) as f32 / 10.0).unwrap();
        let extra = graph.add_node(thru(1, 1));
        graph.remove_node(extra).unwrap();
        let _ = graph.poll();
    }
    stop.store(true, Ordering::Release);
    let blocks = render.join().unwrap();
    assert!(blocks > 0);
    assert_eq!(graph.node_count(), 3);
}
