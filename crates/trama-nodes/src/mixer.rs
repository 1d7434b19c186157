//! Stereo track mixer
//!
//! Sums N stereo tracks into one stereo output with a per-track level and a
//! master level. Inputs are laid out track by track: track `t` occupies
//! audio inputs `2t` (left) and `2t + 1` (right).

use trama_core::{PortCount, PortType, ProcessBlock, Processor, apply_gain_ramp, db_to_linear};

use crate::param::ParamDescriptor;

/// Most tracks a mixer accepts.
pub const MAX_TRACKS: usize = 16;

const MIN_DB: f32 = -60.0;
const MAX_DB: f32 = 12.0;

/// Level ramp for one strip.
#[derive(Debug, Clone, Copy)]
struct Strip {
    db: f32,
    last_gain: f32,
}

impl Strip {
    fn new() -> Self {
        Self {
            db: 0.0,
            last_gain: 1.0,
        }
    }

    fn target(&self) -> f32 {
        if self.db <= MIN_DB {
            0.0
        } else {
            db_to_linear(self.db)
        }
    }
}

/// N-track stereo mixer.
///
/// Parameters `0..tracks` are the track levels in dB; parameter `tracks` is
/// the master level. Levels at or below -60 dB mute.
#[derive(Debug, Clone)]
pub struct AudioMixer {
    tracks: Vec<Strip>,
    master: Strip,
    names: Vec<String>,
}

impl AudioMixer {
    /// Creates a mixer with `tracks` stereo inputs (clamped to 1-16).
    pub fn new(tracks: usize) -> Self {
        let tracks = tracks.clamp(1, MAX_TRACKS);
        let mut names: Vec<String> = (1..=tracks).map(|t| format!("Track {t}")).collect();
        names.push("Master".to_string());
        Self {
            tracks: vec![Strip::new(); tracks],
            master: Strip::new(),
            names,
        }
    }

    /// Number of stereo tracks.
    pub fn tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Range metadata shared by every strip.
    pub fn descriptor(&self, index: usize) -> Option<ParamDescriptor> {
        (index <= self.tracks.len()).then_some(ParamDescriptor::gain_db(
            if index == self.tracks.len() { "Master" } else { "Track" },
            MIN_DB,
            MAX_DB,
            0.0,
        ))
    }

    /// Sets a track level in dB. Out-of-range tracks are ignored.
    pub fn set_track_db(&mut self, track: usize, db: f32) {
        if let Some(strip) = self.tracks.get_mut(track) {
            strip.db = clamp_db(db);
        }
    }

    /// Track level in dB.
    pub fn track_db(&self, track: usize) -> Option<f32> {
        self.tracks.get(track).map(|s| s.db)
    }

    /// Sets the master level in dB.
    pub fn set_master_db(&mut self, db: f32) {
        self.master.db = clamp_db(db);
    }

    /// Master level in dB.
    pub fn master_db(&self) -> f32 {
        self.master.db
    }
}

impl Default for AudioMixer {
    fn default() -> Self {
        Self::new(4)
    }
}

fn clamp_db(db: f32) -> f32 {
    if db.is_nan() { 0.0 } else { db.clamp(MIN_DB, MAX_DB) }
}

impl Processor for AudioMixer {
    fn name(&self) -> &str {
        "Audio Mixer"
    }

    fn ports(&self, _sample_rate: f64, _block_size: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, self.tracks.len() as u32 * 2, 2)
    }

    fn release(&mut self) {
        for strip in self.tracks.iter_mut().chain(core::iter::once(&mut self.master)) {
            strip.last_gain = strip.target();
        }
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let frames = block.frames;
        if frames == 0 {
            return;
        }
        let step_scale = 1.0 / frames as f32;
        for (t, strip) in self.tracks.iter_mut().enumerate() {
            let from = strip.last_gain;
            let to = strip.target();
            strip.last_gain = to;
            if from == 0.0 && to == 0.0 {
                continue;
            }
            let step = (to - from) * step_scale;
            for side in 0..2 {
                let input = &block.audio_in.channel(t * 2 + side)[..frames];
                let output = &mut block.audio_out.channel_mut(side)[..frames];
                let mut gain = from;
                for (o, i) in output.iter_mut().zip(input) {
                    *o += i * gain;
                    gain += step;
                }
            }
        }

        let from = self.master.last_gain;
        let to = self.master.target();
        self.master.last_gain = to;
        for side in 0..2 {
            apply_gain_ramp(block.output(side), from, to);
        }
    }

    fn parameter_count(&self) -> usize {
        self.tracks.len() + 1
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn parameter(&self, index: usize) -> Option<f32> {
        match index.cmp(&self.tracks.len()) {
            core::cmp::Ordering::Less => self.track_db(index),
            core::cmp::Ordering::Equal => Some(self.master.db),
            core::cmp::Ordering::Greater => None,
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) -> bool {
        match index.cmp(&self.tracks.len()) {
            core::cmp::Ordering::Less => self.set_track_db(index, value),
            core::cmp::Ordering::Equal => self.set_master_db(value),
            core::cmp::Ordering::Greater => return false,
        }
        true
    }
}
