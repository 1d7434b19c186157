//! Engine configuration file format and conversions.

use serde::{Deserialize, Serialize};
use std::path::Path;

use trama_core::{
    DEFAULT_RETRY_LIMIT, EngineSettings, GraphSettings, Meter, OversampleFactor,
    TransportSettings,
};

use crate::error::ConfigError;
use crate::validation::validate_config;

/// Engine settings as stored on disk.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 48000
/// block_size = 512
/// oversampling = 1
/// retry_limit = 65536
/// plan_queue_capacity = 8
/// midi_event_capacity = 512
/// send_midi_transport = false
///
/// [transport]
/// tempo = 120.0
/// beats_per_bar = 4
/// beat_divisor = 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Maximum frames per block.
    pub block_size: usize,
    /// Default oversampling factor for new processor nodes (1, 2, 4 or 8).
    pub oversampling: u32,
    /// Retry bound for control-thread atomic exchanges.
    pub retry_limit: u32,
    /// Render plans that may be in flight to the render thread.
    pub plan_queue_capacity: usize,
    /// Events each MIDI buffer holds.
    pub midi_event_capacity: usize,
    /// Send MIDI Start/Continue/Stop on play-state changes.
    pub send_midi_transport: bool,
    /// Initial transport state.
    pub transport: TransportConfig,
}

/// `[transport]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Tempo in BPM.
    pub tempo: f32,
    /// Time signature numerator.
    pub beats_per_bar: u16,
    /// Time signature denominator exponent: 2 means quarter notes.
    pub beat_divisor: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            oversampling: 1,
            retry_limit: DEFAULT_RETRY_LIMIT,
            plan_queue_capacity: 8,
            midi_event_capacity: 512,
            send_midi_transport: false,
            transport: TransportConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            beats_per_bar: 4,
            beat_divisor: 2,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load `path`, or the defaults if it does not exist.
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(e) if e.is_not_found() => Ok(Self::default()),
            other => other,
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self)?;
        Ok(())
    }

    /// Oversampling factor, falling back to none for unsupported values.
    pub fn oversampling_factor(&self) -> OversampleFactor {
        OversampleFactor::from_factor(self.oversampling as usize).unwrap_or_default()
    }

    /// Time signature.
    pub fn meter(&self) -> Meter {
        Meter::new(self.transport.beats_per_bar, self.transport.beat_divisor)
    }
}

impl From<&EngineConfig> for GraphSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_rate: f64::from(config.sample_rate),
            block_size: config.block_size,
            retry_limit: config.retry_limit,
            plan_queue_capacity: config.plan_queue_capacity,
            midi_event_capacity: config.midi_event_capacity,
            ..GraphSettings::default()
        }
    }
}

impl From<&EngineConfig> for TransportSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_rate: f64::from(config.sample_rate),
            tempo: config.transport.tempo,
            meter: config.meter(),
            retry_limit: config.retry_limit,
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            graph: config.into(),
            transport: config.into(),
            send_midi_transport: config.send_midi_transport,
        }
    }
}
