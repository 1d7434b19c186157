//! Sine test tone

use core::f32::consts::TAU;

use libm::sinf;
use trama_core::{PortCount, PortType, PrepareError, ProcessBlock, Processor, db_to_linear};

use crate::param::ParamDescriptor;

/// Frequency parameter.
pub const FREQUENCY_PARAM: ParamDescriptor =
    ParamDescriptor::rate_hz("Frequency", 20.0, 20000.0, 440.0);
/// Level parameter.
pub const LEVEL_PARAM: ParamDescriptor = ParamDescriptor::gain_db("Level", -60.0, 0.0, -12.0);

/// Stereo sine source with no inputs.
///
/// # Example
///
/// ```rust
/// use trama_core::Processor;
/// use trama_nodes::Oscillator;
///
/// let mut osc = Oscillator::new();
/// osc.prepare(48000.0, 256).unwrap();
/// osc.set_frequency(1000.0);
/// assert_eq!(osc.parameter(0), Some(1000.0));
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    frequency: f32,
    level_db: f32,
    sample_rate: f32,
    /// Normalized phase in `[0, 1)`.
    phase: f32,
}

impl Oscillator {
    /// Creates a 440 Hz tone at -12 dB.
    pub fn new() -> Self {
        Self {
            frequency: FREQUENCY_PARAM.default,
            level_db: LEVEL_PARAM.default,
            sample_rate: 48000.0,
            phase: 0.0,
        }
    }

    /// Sets the frequency in Hz.
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = FREQUENCY_PARAM.clamp(hz);
    }

    /// Frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Sets the level in dB.
    pub fn set_level_db(&mut self, db: f32) {
        self.level_db = LEVEL_PARAM.clamp(db);
    }

    /// Level in dB.
    pub fn level_db(&self) -> f32 {
        self.level_db
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Oscillator {
    fn name(&self) -> &str {
        "Oscillator"
    }

    fn ports(&self, _sample_rate: f64, _block_size: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, 0, 2)
    }

    fn prepare(&mut self, sample_rate: f64, _block_size: usize) -> Result<(), PrepareError> {
        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return Err(PrepareError::new(format!("invalid sample rate {sample_rate}")));
        }
        self.sample_rate = sample_rate as f32;
        self.phase = 0.0;
        Ok(())
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let increment = self.frequency / self.sample_rate;
        let amplitude = db_to_linear(self.level_db);
        let start = self.phase;
        let mut end = start;
        for ch in 0..2 {
            let mut phase = start;
            for s in block.output(ch).iter_mut() {
                *s = sinf(phase * TAU) * amplitude;
                phase += increment;
                if phase >= 1.0 {
                    phase -= 1.0;
                }
            }
            end = phase;
        }
        self.phase = end;
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        match index {
            0 => Some(FREQUENCY_PARAM.name),
            1 => Some(LEVEL_PARAM.name),
            _ => None,
        }
    }

    fn parameter(&self, index: usize) -> Option<f32> {
        match index {
            0 => Some(self.frequency),
            1 => Some(self.level_db),
            _ => None,
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) -> bool {
        match index {
            0 => self.set_frequency(value),
            1 => self.set_level_db(value),
            _ => return false,
        }
        true
    }
}
