//! MIDI channel filter
//!
//! Passes channel-voice messages only on enabled channels. System messages
//! (clock, start, stop, sysex fragments) always pass.

use trama_core::{PortCount, PortType, ProcessBlock, Processor};

/// Number of MIDI channels.
pub const CHANNELS: usize = 16;

const NAMES: [&str; CHANNELS] = [
    "Channel 1",
    "Channel 2",
    "Channel 3",
    "Channel 4",
    "Channel 5",
    "Channel 6",
    "Channel 7",
    "Channel 8",
    "Channel 9",
    "Channel 10",
    "Channel 11",
    "Channel 12",
    "Channel 13",
    "Channel 14",
    "Channel 15",
    "Channel 16",
];

/// One MIDI input, one MIDI output, one on/off parameter per channel.
///
/// Parameter `n` enables zero-based channel `n`; values at or above 0.5 are on.
#[derive(Debug, Clone)]
pub struct MidiChannelFilter {
    enabled: [bool; CHANNELS],
}

impl MidiChannelFilter {
    /// All channels enabled.
    pub fn new() -> Self {
        Self {
            enabled: [true; CHANNELS],
        }
    }

    /// Only `channel` (zero-based) enabled.
    pub fn only(channel: u8) -> Self {
        let mut filter = Self {
            enabled: [false; CHANNELS],
        };
        filter.set_channel_enabled(channel, true);
        filter
    }

    /// Enables or disables a zero-based channel. Out-of-range channels are ignored.
    pub fn set_channel_enabled(&mut self, channel: u8, enabled: bool) {
        if let Some(slot) = self.enabled.get_mut(channel as usize) {
            *slot = enabled;
        }
    }

    /// True if the zero-based channel passes.
    pub fn is_channel_enabled(&self, channel: u8) -> bool {
        self.enabled.get(channel as usize).copied().unwrap_or(false)
    }
}

impl Default for MidiChannelFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for MidiChannelFilter {
    fn name(&self) -> &str {
        "MIDI Channel Filter"
    }

    fn ports(&self, _sample_rate: f64, _block_size: usize) -> PortCount {
        PortCount::new().with(PortType::Midi, 1, 1)
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let (Some(input), Some(output)) = (block.midi_in.first(), block.midi_out.first_mut())
        else {
            return;
        };
        for event in input {
            if event.channel().is_none_or(|ch| self.enabled[ch as usize]) {
                output.push(*event);
            }
        }
    }

    fn parameter_count(&self) -> usize {
        CHANNELS
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        NAMES.get(index).copied()
    }

    fn parameter(&self, index: usize) -> Option<f32> {
        self.enabled
            .get(index)
            .map(|&on| if on { 1.0 } else { 0.0 })
    }

    fn set_parameter(&mut self, index: usize, value: f32) -> bool {
        match self.enabled.get_mut(index) {
            Some(slot) => {
                *slot = value >= 0.5;
                true
            }
            None => false,
        }
    }
}
