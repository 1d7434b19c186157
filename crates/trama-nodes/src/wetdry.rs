//! Wet/dry blend
//!
//! Four audio inputs: a processed ("wet") stereo pair on inputs 0-1 and the
//! untouched ("dry") pair on inputs 2-3. Two audio outputs.

use trama_core::{PortCount, PortType, ProcessBlock, Processor};

use crate::param::ParamDescriptor;

/// Wet level parameter.
pub const WET_PARAM: ParamDescriptor = ParamDescriptor::level("Wet", 0.33);
/// Dry level parameter.
pub const DRY_PARAM: ParamDescriptor = ParamDescriptor::level("Dry", 0.40);

const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;

/// Per-sample coefficients: direct wet, crossed wet, dry.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    wet1: f32,
    wet2: f32,
    dry: f32,
}

impl Coefficients {
    fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            wet1: self.wet1 + (to.wet1 - self.wet1) * t,
            wet2: self.wet2 + (to.wet2 - self.wet2) * t,
            dry: self.dry + (to.dry - self.dry) * t,
        }
    }
}

/// Blends a wet and a dry stereo pair.
///
/// ```text
/// out_l = wet_l * wet1 + wet_r * wet2 + dry_l * dry
/// out_r = wet_r * wet1 + wet_l * wet2 + dry_r * dry
/// ```
///
/// with `wet1 = wet * 3`, `wet2 = 0`, `dry = dry * 2`.
#[derive(Debug, Clone)]
pub struct WetDry {
    wet: f32,
    dry: f32,
    last: Coefficients,
}

impl WetDry {
    /// Creates a blend at the default levels.
    pub fn new() -> Self {
        let mut wd = Self {
            wet: WET_PARAM.default,
            dry: DRY_PARAM.default,
            last: Coefficients {
                wet1: 0.0,
                wet2: 0.0,
                dry: 0.0,
            },
        };
        wd.last = wd.target();
        wd
    }

    /// Sets the wet level (0-1).
    pub fn set_wet(&mut self, wet: f32) {
        self.wet = WET_PARAM.clamp(wet);
    }

    /// Wet level.
    pub fn wet(&self) -> f32 {
        self.wet
    }

    /// Sets the dry level (0-1).
    pub fn set_dry(&mut self, dry: f32) {
        self.dry = DRY_PARAM.clamp(dry);
    }

    /// Dry level.
    pub fn dry(&self) -> f32 {
        self.dry
    }

    fn target(&self) -> Coefficients {
        Coefficients {
            wet1: self.wet * WET_SCALE,
            wet2: 0.0,
            dry: self.dry * DRY_SCALE,
        }
    }
}

impl Default for WetDry {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for WetDry {
    fn name(&self) -> &str {
        "Wet/Dry"
    }

    fn ports(&self, _sample_rate: f64, _block_size: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, 4, 2)
    }

    fn release(&mut self) {
        self.last = self.target();
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        let frames = block.frames;
        if frames == 0 {
            return;
        }
        let from = self.last;
        let to = self.target();
        let scale = 1.0 / frames as f32;
        let inputs = block.audio_in;
        let (wet_l, wet_r) = (&inputs.channel(0)[..frames], &inputs.channel(1)[..frames]);
        let (dry_l, dry_r) = (&inputs.channel(2)[..frames], &inputs.channel(3)[..frames]);

        for (side, (direct, crossed, dry)) in
            [(wet_l, wet_r, dry_l), (wet_r, wet_l, dry_r)].into_iter().enumerate()
        {
            let output = block.output(side);
            for (i, o) in output.iter_mut().enumerate() {
                let c = from.lerp(to, i as f32 * scale);
                *o = direct[i] * c.wet1 + crossed[i] * c.wet2 + dry[i] * c.dry;
            }
        }
        self.last = to;
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        match index {
            0 => Some(WET_PARAM.name),
            1 => Some(DRY_PARAM.name),
            _ => None,
        }
    }

    fn parameter(&self, index: usize) -> Option<f32> {
        match index {
            0 => Some(self.wet),
            1 => Some(self.dry),
            _ => None,
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) -> bool {
        match index {
            0 => self.set_wet(value),
            1 => self.set_dry(value),
            _ => return false,
        }
        true
    }
}
