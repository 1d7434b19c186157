//! Block oversampling for graph nodes.
//!
//! A node with a factor above 1 is prepared at `sample_rate * factor` and
//! `block_size * factor`. Each block its audio inputs are upsampled by linear
//! interpolation, the processor runs at the higher rate, and the outputs are
//! decimated through a 16-tap anti-aliasing FIR.
//!
//! # Example
//!
//! ```rust
//! use trama_core::{AudioBuffer, OversampleFactor, Oversampler};
//!
//! let factor = OversampleFactor::X4;
//! let mut os = Oversampler::new(factor, 1, 1);
//! let mut input = AudioBuffer::new(1, 64);
//! input.channel_mut(0).fill(1.0);
//! let mut high = AudioBuffer::new(1, 64 * factor.factor());
//! let mut output = AudioBuffer::new(1, 64);
//!
//! for _ in 0..4 {
//!     os.upsample(&input, &mut high, 64);
//!     os.downsample(&high, &mut output, 64);
//! }
//! assert!((output.channel(0)[63] - 1.0).abs() < 0.02);
//! ```

use crate::graph::AudioBuffer;

/// FIR filter order (taps - 1).
const FILTER_ORDER: usize = 15;

/// Anti-aliasing filter taps.
const FILTER_TAPS: usize = FILTER_ORDER + 1;

/// Supported oversampling ratios.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OversampleFactor {
    /// No oversampling.
    #[default]
    X1,
    /// 2× oversampling.
    X2,
    /// 4× oversampling.
    X4,
    /// 8× oversampling.
    X8,
}

impl OversampleFactor {
    /// Maps a ratio of 1, 2, 4 or 8.
    pub fn from_factor(factor: usize) -> Option<Self> {
        match factor {
            1 => Some(Self::X1),
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            8 => Some(Self::X8),
            _ => None,
        }
    }

    /// The ratio.
    pub fn factor(self) -> usize {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }

    /// Added latency at the base rate, rounded up.
    pub fn latency_samples(self) -> usize {
        match self {
            Self::X1 => 0,
            f => (FILTER_ORDER / 2).div_ceil(f.factor()),
        }
    }

    fn coefficients(self) -> &'static [f32; FILTER_TAPS] {
        match self {
            Self::X1 | Self::X2 => &COEFFS_2X,
            Self::X4 => &COEFFS_4X,
            Self::X8 => &COEFFS_8X,
        }
    }
}

/// Per-channel interpolation and decimation state.
#[derive(Clone, Debug)]
pub struct Oversampler {
    factor: OversampleFactor,
    prev: Vec<f32>,
    history: Vec<[f32; FILTER_TAPS]>,
}

impl Oversampler {
    /// State for `inputs` upsampled and `outputs` decimated channels.
    pub fn new(factor: OversampleFactor, inputs: usize, outputs: usize) -> Self {
        Self {
            factor,
            prev: vec![0.0; inputs],
            history: vec![[0.0; FILTER_TAPS]; outputs],
        }
    }

    /// The ratio this state was built for.
    pub fn factor(&self) -> OversampleFactor {
        self.factor
    }

    /// Added latency at the base rate.
    pub fn latency_samples(&self) -> usize {
        self.factor.latency_samples()
    }

    /// Upsamples `frames` base-rate frames of each channel into `output`.
    pub fn upsample(&mut self, input: &AudioBuffer, output: &mut AudioBuffer, frames: usize) {
        let factor = self.factor.factor();
        let step = 1.0 / factor as f32;
        let channels = input.channels().min(output.channels()).min(self.prev.len());
        for ch in 0..channels {
            let mut prev = self.prev[ch];
            let src = &input.channel(ch)[..frames];
            let dest = &mut output.channel_mut(ch)[..frames * factor];
            for (x, chunk) in src.iter().zip(dest.chunks_exact_mut(factor)) {
                for (i, d) in chunk.iter_mut().enumerate() {
                    let t = (i as f32 + 1.0) * step;
                    *d = prev + t * (x - prev);
                }
                prev = *x;
            }
            self.prev[ch] = prev;
        }
    }

    /// Filters and decimates `frames * factor` high-rate frames into `output`.
    pub fn downsample(&mut self, input: &AudioBuffer, output: &mut AudioBuffer, frames: usize) {
        let factor = self.factor.factor();
        let coeffs = self.factor.coefficients();
        let channels = input.channels().min(output.channels()).min(self.history.len());
        for ch in 0..channels {
            let history = &mut self.history[ch];
            let src = &input.channel(ch)[..frames * factor];
            let dest = &mut output.channel_mut(ch)[..frames];
            for (chunk, d) in src.chunks_exact(factor).zip(dest.iter_mut()) {
                for &x in chunk {
                    history.copy_within(0..FILTER_TAPS - 1, 1);
                    history[0] = x;
                }
                *d = history.iter().zip(coeffs).map(|(h, c)| h * c).sum();
            }
        }
    }

    /// Clears filter history.
    pub fn reset(&mut self) {
        self.prev.fill(0.0);
        for h in &mut self.history {
            *h = [0.0; FILTER_TAPS];
        }
    }
}

// Windowed-sinc lowpass (Kaiser window, ~60 dB stopband), symmetric for
// linear phase. Cutoffs sit at the base-rate Nyquist: 0.4, 0.2 and 0.1 of the
// oversampled Nyquist for 2×, 4× and 8×. Sums are normalised to unity DC gain.

#[allow(clippy::excessive_precision)]
#[rustfmt::skip]
static COEFFS_2X: [f32; FILTER_TAPS] = [
    -0.00152541,  0.00000000,  0.01309369,  0.00000000,
    -0.05738920,  0.00000000,  0.29581875,  0.50000434,
     0.29581875,  0.00000000, -0.05738920,  0.00000000,
     0.01309369,  0.00000000, -0.00152541,  0.00000000,
];

#[allow(clippy::excessive_precision)]
#[rustfmt::skip]
static COEFFS_4X: [f32; FILTER_TAPS] = [
    0.0018645282, 0.0068257641, 0.0172712655, 0.0342604001,
    0.0571166576, 0.0830896230, 0.1078345458, 0.1260221675,
    0.1332946246, 0.1260221675, 0.1078345458, 0.0830896230,
    0.0571166576, 0.0342604001, 0.0172712655, 0.0068257641,
];

#[allow(clippy::excessive_precision)]
#[rustfmt::skip]
static COEFFS_8X: [f32; FILTER_TAPS] = [
    0.0048323092, 0.0131400047, 0.0264623493, 0.0438249658,
    0.0634416395, 0.0828886958, 0.0994801510, 0.1107812341,
    0.1151296104, 0.1107812341, 0.0994801510, 0.0828886958,
    0.0634416395, 0.0438249658, 0.0264623493, 0.0131400047,
];
