//! Gain and level helpers used on the render path.

use libm::{expf, logf, sqrtf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use trama_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Values at or below zero clamp to -200 dB.
///
/// # Example
/// ```rust
/// use trama_core::linear_to_db;
///
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Multiply `samples` by a gain moving linearly from `from` toward `to`.
///
/// Sample `i` is scaled by `from + (to - from) * i / len`, so consecutive
/// blocks chained through the same target join without a step.
#[inline]
pub fn apply_gain_ramp(samples: &mut [f32], from: f32, to: f32) {
    if samples.is_empty() {
        return;
    }
    if from == to {
        apply_gain(samples, to);
        return;
    }
    let step = (to - from) / samples.len() as f32;
    let mut gain = from;
    for s in samples.iter_mut() {
        *s *= gain;
        gain += step;
    }
}

/// Multiply `samples` by a constant gain. Unity is a no-op.
#[inline]
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    if gain == 0.0 {
        samples.fill(0.0);
        return;
    }
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Root-mean-square level of a block. Empty blocks read as silence.
#[inline]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    sqrtf(sum / samples.len() as f32)
}
