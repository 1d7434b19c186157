//! Range checks for engine configuration.
//!
//! Every field is checked and all failures are reported together.
//!
//! # Example
//!
//! ```rust
//! use trama_config::{EngineConfig, validate_config, ValidationError};
//!
//! let mut config = EngineConfig::default();
//! assert!(validate_config(&config).is_ok());
//!
//! config.oversampling = 3;
//! assert_eq!(validate_config(&config), Err(ValidationError::InvalidOversampling(3)));
//! ```

use thiserror::Error;
use trama_core::{Meter, OversampleFactor};

use crate::engine_config::EngineConfig;

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 768_000;
/// Largest accepted block size in frames.
pub const MAX_BLOCK_SIZE: usize = 16_384;
/// Largest accepted MIDI buffer capacity.
pub const MAX_MIDI_EVENTS: usize = 65_536;
/// Accepted tempo range in BPM.
pub const TEMPO_RANGE: (f32, f32) = (20.0, 999.0);

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric value out of range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name as written in TOML.
        field: String,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Oversampling factor other than 1, 2, 4 or 8.
    #[error("oversampling factor {0} is not one of 1, 2, 4, 8")]
    InvalidOversampling(u32),

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check<T: Into<f64> + PartialOrd + Copy>(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: T,
    min: T,
    max: T,
) {
    // NaN fails both comparisons, so test for the in-range case.
    let in_range = value >= min && value <= max;
    if !in_range {
        errors.push(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value.into(),
            min: min.into(),
            max: max.into(),
        });
    }
}

fn saturate(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Checks every field of `config`.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    check(&mut errors, "sample_rate", config.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE);
    check(
        &mut errors,
        "block_size",
        saturate(config.block_size),
        1,
        MAX_BLOCK_SIZE as u32,
    );
    if OversampleFactor::from_factor(config.oversampling as usize).is_none() {
        errors.push(ValidationError::InvalidOversampling(config.oversampling));
    }
    check(&mut errors, "retry_limit", config.retry_limit, 1, u32::MAX);
    check(
        &mut errors,
        "plan_queue_capacity",
        saturate(config.plan_queue_capacity),
        1,
        1024,
    );
    check(
        &mut errors,
        "midi_event_capacity",
        saturate(config.midi_event_capacity),
        1,
        MAX_MIDI_EVENTS as u32,
    );

    let transport = &config.transport;
    check(&mut errors, "transport.tempo", transport.tempo, TEMPO_RANGE.0, TEMPO_RANGE.1);
    check(&mut errors, "transport.beats_per_bar", transport.beats_per_bar, 1, 64);
    check(
        &mut errors,
        "transport.beat_divisor",
        transport.beat_divisor,
        0,
        Meter::MAX_DIVISOR,
    );

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
