//! The render-thread half of a graph.
//!
//! A [`Renderer`] receives compiled plans from its `GraphProcessor` over a
//! wait-free SPSC ring and hands each replaced plan back on a second ring, so
//! buffers are only ever freed on the control thread. A plan is adopted only
//! when the return ring has room for the one it replaces.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::atomic::SpinLock;
use crate::math::{apply_gain_ramp, rms};
use crate::transport::TimeInfo;

use super::buffer::{AudioBuffer, MidiBuffer};
use super::node::NodeKind;
use super::plan::{RenderPlan, RenderStep, RouteKind};
use super::processor::ProcessBlock;

/// Host-side buffers for one block.
pub struct HostIo<'a> {
    /// Audio arriving from the host, read by `AudioInput` nodes.
    pub audio_in: &'a AudioBuffer,
    /// Audio for the host, summed from `AudioOutput` nodes. Cleared first.
    pub audio_out: &'a mut AudioBuffer,
    /// MIDI arriving from the host, read by `MidiInput` nodes.
    pub midi_in: &'a MidiBuffer,
    /// MIDI for the host, merged from `MidiOutput` nodes. Cleared first.
    pub midi_out: &'a mut MidiBuffer,
}

/// Counters published by the render thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Blocks rendered.
    pub blocks: u64,
    /// Plans adopted.
    pub plan_swaps: u64,
    /// Node blocks skipped because the control thread held the processor.
    pub busy_skips: u64,
    /// MIDI events dropped because a buffer was full.
    pub midi_dropped: u64,
}

impl RenderStats {
    fn absorb(&mut self, other: &RenderStats) {
        self.blocks += other.blocks;
        self.plan_swaps += other.plan_swaps;
        self.busy_skips += other.busy_skips;
        self.midi_dropped += other.midi_dropped;
    }
}

/// State the renderer publishes back to its graph.
#[derive(Debug, Default)]
pub(crate) struct RenderShared {
    pub active_generation: AtomicU64,
    pub rendering: AtomicBool,
    pub stats: SpinLock<RenderStats>,
}

/// Renders the graph one block at a time. Lives on the render thread.
pub struct Renderer {
    plans: rtrb::Consumer<RenderPlan>,
    retired: rtrb::Producer<RenderPlan>,
    current: Option<RenderPlan>,
    shared: Arc<RenderShared>,
    unpublished: RenderStats,
}

impl core::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Renderer")
            .field("generation", &self.generation())
            .field("steps", &self.current.as_ref().map_or(0, |p| p.steps.len()))
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub(crate) fn new(
        plans: rtrb::Consumer<RenderPlan>,
        retired: rtrb::Producer<RenderPlan>,
        shared: Arc<RenderShared>,
    ) -> Self {
        Self {
            plans,
            retired,
            current: None,
            shared,
            unpublished: RenderStats::default(),
        }
    }

    /// Generation of the plan being rendered, or 0 before the first one.
    pub fn generation(&self) -> u64 {
        self.current.as_ref().map_or(0, |p| p.generation)
    }

    /// Prepared block size of the current plan.
    pub fn block_size(&self) -> usize {
        self.current.as_ref().map_or(0, |p| p.block_size)
    }

    /// Renders `frames` frames. Never allocates or blocks.
    ///
    /// `frames` is clamped to the prepared block size; frames beyond it stay silent.
    pub fn render(&mut self, frames: usize, io: &mut HostIo<'_>, time: &TimeInfo) {
        self.adopt_pending();
        self.shared.rendering.store(true, Ordering::Release);
        io.audio_out.clear_frames(frames);
        io.midi_out.clear();

        // A released graph keeps an empty plan and renders silence.
        if let Some(plan) = self.current.as_mut().filter(|plan| !plan.steps.is_empty()) {
            debug_assert!(frames <= plan.block_size, "block of {frames} frames exceeds plan");
            let frames = frames.min(plan.block_size);
            for i in 0..plan.steps.len() {
                render_step(&mut plan.steps, i, frames, io, time, &mut self.unpublished);
            }
        }

        self.unpublished.blocks += 1;
        self.publish_stats();
    }

    fn adopt_pending(&mut self) {
        while !self.retired.is_full() {
            let Ok(plan) = self.plans.pop() else {
                break;
            };
            self.shared
                .active_generation
                .store(plan.generation, Ordering::Release);
            if let Some(old) = self.current.replace(plan) {
                // Cannot fail: checked for a free slot above.
                let _ = self.retired.push(old);
            }
            self.unpublished.plan_swaps += 1;
        }
    }

    fn publish_stats(&mut self) {
        if let Some(mut stats) = self.shared.stats.try_lock() {
            stats.absorb(&self.unpublished);
            self.unpublished = RenderStats::default();
        }
    }
}

fn gather(step: &mut RenderStep, done: &[RenderStep], frames: usize, stats: &mut RenderStats) {
    step.audio_in.clear_frames(frames);
    step.control_in.fill(0.0);
    for midi in &mut step.midi_in {
        midi.clear();
    }
    for route in &step.routes {
        let Some(source) = done.get(route.source_step) else {
            continue;
        };
        match route.kind {
            RouteKind::Signal => {
                let src = &source.audio_out.channel(route.from)[..frames];
                step.audio_in.add_to_channel(route.to, src);
            }
            RouteKind::ControlToSignal => {
                let value = source.control_out.get(route.from).copied().unwrap_or(0.0);
                for s in &mut step.audio_in.channel_mut(route.to)[..frames] {
                    *s += value;
                }
            }
            RouteKind::Control => {
                if let (Some(d), Some(s)) =
                    (step.control_in.get_mut(route.to), source.control_out.get(route.from))
                {
                    *d += *s;
                }
            }
            RouteKind::Midi => {
                if let (Some(d), Some(s)) =
                    (step.midi_in.get_mut(route.to), source.midi_out.get(route.from))
                {
                    stats.midi_dropped += d.merge_from(s) as u64;
                }
            }
        }
    }
}

fn render_step(
    steps: &mut [RenderStep],
    i: usize,
    frames: usize,
    io: &mut HostIo<'_>,
    time: &TimeInfo,
    stats: &mut RenderStats,
) {
    let (done, rest) = steps.split_at_mut(i);
    let Some(step) = rest.first_mut() else {
        return;
    };
    gather(step, done, frames, stats);

    let node = Arc::clone(&step.node);
    if !node.is_prepared() {
        step.silence(frames);
        return;
    }

    match step.kind {
        NodeKind::AudioInput => {
            let channels = step.audio_out.channels().min(io.audio_in.channels());
            step.silence(frames);
            for ch in 0..channels {
                step.audio_out
                    .copy_to_channel(ch, &io.audio_in.channel(ch)[..frames]);
                node.set_output_rms(ch, rms(&step.audio_out.channel(ch)[..frames]));
            }
        }
        NodeKind::AudioOutput => {
            let channels = step.audio_in.channels().min(io.audio_out.channels());
            for ch in 0..channels {
                let src = &step.audio_in.channel(ch)[..frames];
                node.set_input_rms(ch, rms(src));
                io.audio_out.add_to_channel(ch, src);
            }
        }
        NodeKind::MidiInput => {
            step.silence(frames);
            if let Some(out) = step.midi_out.first_mut() {
                stats.midi_dropped += out.copy_from(io.midi_in) as u64;
            }
        }
        NodeKind::MidiOutput => {
            if let Some(input) = step.midi_in.first() {
                stats.midi_dropped += io.midi_out.merge_from(input) as u64;
            }
        }
        NodeKind::Processor | NodeKind::SubGraph => process_node(step, frames, time, stats),
    }
}

fn process_node(step: &mut RenderStep, frames: usize, time: &TimeInfo, stats: &mut RenderStats) {
    let node = Arc::clone(&step.node);
    if node.has_failed() || node.is_suspended() || !node.is_enabled() {
        step.silence(frames);
        return;
    }
    let Some(mut guard) = node.try_body() else {
        stats.busy_skips += 1;
        step.silence(frames);
        return;
    };
    let Some(body) = guard.as_mut() else {
        step.silence(frames);
        return;
    };

    let ramp = node.update_gain();
    let layout = node.layout();
    for (ch, &slot) in layout.audio_in.iter().enumerate() {
        let samples = &mut step.audio_in.channel_mut(slot)[..frames];
        apply_gain_ramp(samples, ramp.input_from, ramp.input_to);
        node.set_input_rms(ch, rms(samples));
    }

    step.silence(frames);
    // A plan that outlived a re-prepare may carry more frames than the node now takes.
    let processed = frames.min(body.block_size);
    match body.oversampling.as_mut() {
        None => {
            let mut block = ProcessBlock {
                frames: processed,
                audio_in: &step.audio_in,
                audio_out: &mut step.audio_out,
                control_in: &step.control_in,
                control_out: &mut step.control_out,
                midi_in: &step.midi_in,
                midi_out: &mut step.midi_out,
                time,
            };
            body.processor.process(&mut block);
        }
        Some(os) => {
            let factor = os.oversampler.factor().factor();
            let high_frames = processed * factor;
            let high_time = TimeInfo {
                frame: time.frame * factor as i64,
                sample_rate: time.sample_rate * factor as f64,
                ..*time
            };
            os.oversampler
                .upsample(&step.audio_in, &mut os.audio_in, processed);
            for (high, base) in os.midi_in.iter_mut().zip(&step.midi_in) {
                stats.midi_dropped += high.copy_from(base) as u64;
                high.scale_frames(factor as u32);
            }
            os.audio_out.clear_frames(high_frames);
            let mut block = ProcessBlock {
                frames: high_frames,
                audio_in: &os.audio_in,
                audio_out: &mut os.audio_out,
                control_in: &step.control_in,
                control_out: &mut step.control_out,
                midi_in: &os.midi_in,
                midi_out: &mut step.midi_out,
                time: &high_time,
            };
            body.processor.process(&mut block);
            for midi in &mut step.midi_out {
                midi.divide_frames(factor as u32);
            }
            os.oversampler
                .downsample(&os.audio_out, &mut step.audio_out, processed);
        }
    }
    drop(guard);

    let mute_target = if node.is_muted() { 0.0 } else { 1.0 };
    let (from, to) = (ramp.from * step.mute_gain, ramp.to * mute_target);
    step.mute_gain = mute_target;
    for (ch, &slot) in layout.audio_out.iter().enumerate() {
        let samples = &mut step.audio_out.channel_mut(slot)[..frames];
        apply_gain_ramp(samples, from, to);
        node.set_output_rms(ch, rms(samples));
    }
}
