//! Block runner for unit tests.

use trama_core::{AudioBuffer, MidiBuffer, ProcessBlock, Processor, TimeInfo};

/// Runs one block with planar `inputs`, returning `outputs` planar channels.
pub(crate) fn run_block<P: Processor>(
    processor: &mut P,
    inputs: &[&[f32]],
    outputs: usize,
) -> Vec<Vec<f32>> {
    let frames = inputs.first().map_or(64, |ch| ch.len());
    let mut audio_in = AudioBuffer::new(inputs.len(), frames);
    for (ch, data) in inputs.iter().enumerate() {
        audio_in.copy_to_channel(ch, data);
    }
    let mut audio_out = AudioBuffer::new(outputs, frames);
    let time = TimeInfo::default();
    let mut block = ProcessBlock {
        frames,
        audio_in: &audio_in,
        audio_out: &mut audio_out,
        control_in: &[],
        control_out: &mut [],
        midi_in: &[],
        midi_out: &mut [],
        time: &time,
    };
    processor.process(&mut block);
    (0..outputs)
        .map(|ch| audio_out.channel(ch).to_vec())
        .collect()
}

/// Runs one MIDI-only block.
pub(crate) fn run_midi<P: Processor>(processor: &mut P, input: &MidiBuffer) -> MidiBuffer {
    let audio_in = AudioBuffer::new(0, 64);
    let mut audio_out = AudioBuffer::new(0, 64);
    let mut midi_out = [MidiBuffer::with_capacity(input.capacity().max(16))];
    let time = TimeInfo::default();
    let mut block = ProcessBlock {
        frames: 64,
        audio_in: &audio_in,
        audio_out: &mut audio_out,
        control_in: &[],
        control_out: &mut [],
        midi_in: core::slice::from_ref(input),
        midi_out: &mut midi_out,
        time: &time,
    };
    processor.process(&mut block);
    let [out] = midi_out;
    out
}
