//! Nested graphs rendered as a single node.

use crate::port::{PortCount, PortType};

use super::buffer::MidiBuffer;
use super::processor::{ProcessBlock, Processor};
use super::render::{HostIo, Renderer};

/// Runs a nested graph's renderer inside the outer graph's render pass.
///
/// The node's audio ports are the nested graph's host audio channels; one MIDI
/// port each way feeds its MIDI I/O nodes.
pub(crate) struct SubGraphProcessor {
    renderer: Renderer,
    ports: PortCount,
    no_midi: MidiBuffer,
    midi_sink: MidiBuffer,
}

impl SubGraphProcessor {
    pub(crate) fn new(renderer: Renderer, io: PortCount) -> Self {
        let ports = PortCount::new()
            .with(
                PortType::Audio,
                io.get(PortType::Audio, true),
                io.get(PortType::Audio, false),
            )
            .with(
                PortType::Midi,
                io.get(PortType::Midi, true).min(1),
                io.get(PortType::Midi, false).min(1),
            );
        Self {
            renderer,
            ports,
            no_midi: MidiBuffer::default(),
            midi_sink: MidiBuffer::default(),
        }
    }
}

impl Processor for SubGraphProcessor {
    fn name(&self) -> &str {
        "Graph"
    }

    fn ports(&self, _sample_rate: f64, _block_size: usize) -> PortCount {
        self.ports
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let midi_in = block.midi_in.first().unwrap_or(&self.no_midi);
        let midi_out = match block.midi_out.first_mut() {
            Some(out) => out,
            None => &mut self.midi_sink,
        };
        let mut io = HostIo {
            audio_in: block.audio_in,
            audio_out: &mut *block.audio_out,
            midi_in,
            midi_out,
        };
        self.renderer.render(block.frames, &mut io, block.time);
    }
}
