//! Volume control
//!
//! A single dB gain applied to one or two audio channels, ramped across each
//! block so parameter changes never step.

use trama_core::{PortCount, PortType, ProcessBlock, Processor, apply_gain_ramp, db_to_linear};

use crate::param::ParamDescriptor;

/// Volume parameter: -30 dB (silence) to +12 dB.
pub const VOLUME_PARAM: ParamDescriptor = ParamDescriptor::gain_db("Volume", -30.0, 12.0, 0.0);

/// Gain stage with a mute floor.
///
/// At or below the parameter minimum the output is silent rather than -30 dB.
///
/// # Example
///
/// ```rust
/// use trama_core::Processor;
/// use trama_nodes::Volume;
///
/// let mut volume = Volume::stereo();
/// volume.set_volume_db(-6.0);
/// assert_eq!(volume.parameter(0), Some(-6.0));
/// assert!(volume.set_parameter(0, 3.0));
/// ```
#[derive(Debug, Clone)]
pub struct Volume {
    channels: u32,
    volume_db: f32,
    /// Linear gain reached at the end of the last block.
    last_gain: f32,
}

impl Volume {
    /// Creates a volume with `channels` in and out (clamped to 1-2).
    pub fn new(channels: u32) -> Self {
        Self {
            channels: channels.clamp(1, 2),
            volume_db: VOLUME_PARAM.default,
            last_gain: 1.0,
        }
    }

    /// Mono volume.
    pub fn mono() -> Self {
        Self::new(1)
    }

    /// Stereo volume.
    pub fn stereo() -> Self {
        Self::new(2)
    }

    /// Sets the level in dB.
    pub fn set_volume_db(&mut self, db: f32) {
        self.volume_db = VOLUME_PARAM.clamp(db);
    }

    /// Current level in dB.
    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Linear gain for the current level.
    pub fn target_gain(&self) -> f32 {
        if self.volume_db <= VOLUME_PARAM.min {
            0.0
        } else {
            db_to_linear(self.volume_db)
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::stereo()
    }
}

impl Processor for Volume {
    fn name(&self) -> &str {
        "Volume"
    }

    fn ports(&self, _sample_rate: f64, _block_size: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, self.channels, self.channels)
    }

    fn release(&mut self) {
        self.last_gain = self.target_gain();
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let target = self.target_gain();
        for ch in 0..self.channels as usize {
            block.pass_through(ch);
            apply_gain_ramp(block.output(ch), self.last_gain, target);
        }
        self.last_gain = target;
    }

    fn parameter_count(&self) -> usize {
        1
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        (index == 0).then_some(VOLUME_PARAM.name)
    }

    fn parameter(&self, index: usize) -> Option<f32> {
        (index == 0).then_some(self.volume_db)
    }

    fn set_parameter(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.set_volume_db(value);
        true
    }
}
