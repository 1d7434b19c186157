//! Criterion benchmarks for the render graph (`trama-core::graph`).
//!
//! Measures graph overhead independently of DSP cost using a trivial `Gain`
//! processor. Three axes:
//!
//! - **Publish**: topology rebuild (arc table + Kahn sort) and plan compile per mutation
//! - **Render**: `Renderer::render()` throughput at varying block sizes
//! - **Atomics**: `AtomicValue` get/set cost
//!
//! Run with: `cargo bench -p trama-core -- graph/`
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use trama_core::{
    AtomicValue, AudioBuffer, GraphProcessor, GraphSettings, HostIo, MidiBuffer, NodeKind,
    PortCount, PortType, ProcessBlock, Processor, Renderer, TimeInfo,
};

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

// ---------------------------------------------------------------------------
// Trivial gain processor, isolates graph overhead from DSP cost
// ---------------------------------------------------------------------------

struct Gain(f32);

impl Processor for Gain {
    fn name(&self) -> &str {
        "Gain"
    }

    fn ports(&self, _: f64, _: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, 2, 2)
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        for ch in 0..2 {
            let frames = block.frames;
            let input = &block.audio_in.channel(ch)[..frames];
            let output = &mut block.audio_out.channel_mut(ch)[..frames];
            for (o, i) in output.iter_mut().zip(input) {
                *o = i * self.0;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Graph constructors
// ---------------------------------------------------------------------------

/// input -> gain × n -> output
fn chain(n: usize, block_size: usize) -> (GraphProcessor, Renderer) {
    let (mut graph, renderer) = GraphProcessor::new(GraphSettings::default());
    let input = graph.add_io_node(NodeKind::AudioInput).unwrap();
    let mut prev = input;
    let mut prev_out = 0;
    for _ in 0..n {
        let node = graph.add_node(Box::new(Gain(0.99)));
        for ch in 0..2 {
            let _ = graph.add_connection(prev, prev_out + ch, node, ch);
        }
        prev = node;
        prev_out = 2;
    }
    let output = graph.add_io_node(NodeKind::AudioOutput).unwrap();
    for ch in 0..2 {
        let _ = graph.add_connection(prev, prev_out + ch, output, ch);
    }
    graph.prepare_to_play(SAMPLE_RATE, block_size);
    (graph, renderer)
}

fn render_blocks(renderer: &mut Renderer, block_size: usize) {
    let audio_in = AudioBuffer::new(2, block_size);
    let mut audio_out = AudioBuffer::new(2, block_size);
    let midi_in = MidiBuffer::with_capacity(64);
    let mut midi_out = MidiBuffer::with_capacity(64);
    let mut io = HostIo {
        audio_in: &audio_in,
        audio_out: &mut audio_out,
        midi_in: &midi_in,
        midi_out: &mut midi_out,
    };
    renderer.render(block_size, &mut io, &TimeInfo::default());
    black_box(&audio_out);
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/publish");
    for n in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::new("add_remove", n), &n, |b, &n| {
            let (mut graph, _renderer) = chain(n, 256);
            b.iter(|| {
                let id = graph.add_node(Box::new(Gain(1.0)));
                let _ = graph.remove_node(id);
                let _ = graph.poll();
                black_box(graph.generation())
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/render");
    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("chain16", block_size),
            &block_size,
            |b, &block_size| {
                let (_graph, mut renderer) = chain(16, block_size);
                b.iter(|| render_blocks(&mut renderer, block_size));
            },
        );
    }
    group.finish();
}

fn bench_atomics(c: &mut Criterion) {
    let value = AtomicValue::new(0.0_f32);
    c.bench_function("graph/atomic_get", |b| b.iter(|| black_box(value.get())));
    c.bench_function("graph/atomic_set", |b| {
        b.iter(|| black_box(value.set(black_box(0.5))));
    });
}

criterion_group!(benches, bench_publish, bench_render, bench_atomics);
criterion_main!(benches);
