//! The capability every node body implements.

use crate::port::PortCount;
use crate::transport::TimeInfo;

use super::buffer::{AudioBuffer, MidiBuffer};

/// A processor could not be prepared at the requested rate or block size.
///
/// The node stays in the graph but renders silence until it is prepared again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("prepare failed: {reason}")]
pub struct PrepareError {
    /// Human-readable cause.
    pub reason: String,
}

impl PrepareError {
    /// Creates an error with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Buffers for one block of one node.
///
/// Audio and CV ports share the signal buffers: signal channel `n` is the
/// `n`-th Audio-or-CV port of that direction, in port-list order. Control
/// ports carry one value per block; MIDI ports one [`MidiBuffer`] each.
pub struct ProcessBlock<'a> {
    /// Frames to process. Never more than the prepared block size.
    pub frames: usize,
    /// Signal inputs.
    pub audio_in: &'a AudioBuffer,
    /// Signal outputs. Cleared before `process` is called.
    pub audio_out: &'a mut AudioBuffer,
    /// Control inputs.
    pub control_in: &'a [f32],
    /// Control outputs.
    pub control_out: &'a mut [f32],
    /// MIDI inputs.
    pub midi_in: &'a [MidiBuffer],
    /// MIDI outputs. Cleared before `process` is called.
    pub midi_out: &'a mut [MidiBuffer],
    /// Transport state for this block.
    pub time: &'a TimeInfo,
}

impl ProcessBlock<'_> {
    /// Input signal channel `ch`, trimmed to the block length.
    #[inline]
    pub fn input(&self, ch: usize) -> &[f32] {
        &self.audio_in.channel(ch)[..self.frames]
    }

    /// Output signal channel `ch`, trimmed to the block length.
    #[inline]
    pub fn output(&mut self, ch: usize) -> &mut [f32] {
        &mut self.audio_out.channel_mut(ch)[..self.frames]
    }

    /// Copies input channel `ch` to output channel `ch`.
    pub fn pass_through(&mut self, ch: usize) {
        let frames = self.frames;
        self.audio_out
            .copy_to_channel(ch, &self.audio_in.channel(ch)[..frames]);
    }
}

/// A node body hosted by the graph.
///
/// `prepare`, `release`, `set_suspended` and `ports` run on the control
/// thread. `process` runs on the render thread and must not allocate or block.
pub trait Processor: Send {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Ports this processor exposes at the given rate and block size.
    fn ports(&self, sample_rate: f64, block_size: usize) -> PortCount;

    /// Allocates and resets state for a rate and maximum block size.
    fn prepare(&mut self, sample_rate: f64, block_size: usize) -> Result<(), PrepareError> {
        let _ = (sample_rate, block_size);
        Ok(())
    }

    /// Frees anything `prepare` allocated.
    fn release(&mut self) {}

    /// Processes one block.
    fn process(&mut self, block: &mut ProcessBlock<'_>);

    /// Latency this processor adds, in frames.
    fn latency_samples(&self) -> usize {
        0
    }

    /// Notified when the node is suspended or resumed.
    fn set_suspended(&mut self, suspended: bool) {
        let _ = suspended;
    }

    /// Number of parameters settable through [`set_parameter`](Self::set_parameter).
    fn parameter_count(&self) -> usize {
        0
    }

    /// Name of parameter `index`.
    fn parameter_name(&self, index: usize) -> Option<&str> {
        let _ = index;
        None
    }

    /// Current value of parameter `index`.
    fn parameter(&self, index: usize) -> Option<f32> {
        let _ = index;
        None
    }

    /// Sets parameter `index`. Returns `false` if there is no such parameter.
    fn set_parameter(&mut self, index: usize, value: f32) -> bool {
        let _ = (index, value);
        false
    }
}
