//! Configuration for the trama render graph.
//!
//! Engine settings live in a TOML file. [`EngineConfig`] parses and validates
//! it and converts into the settings structs `trama-core` takes, so the core
//! never reads files or globals itself.
//!
//! # Example
//!
//! ```rust
//! use trama_config::EngineConfig;
//! use trama_core::{Engine, EngineSettings};
//!
//! let config = EngineConfig::from_toml("block_size = 256").unwrap();
//! let (engine, _renderer) = Engine::new(EngineSettings::from(&config), None);
//! assert_eq!(engine.graph().settings().block_size, 256);
//! ```

mod engine_config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Range checks.
pub mod validation;

pub use engine_config::{EngineConfig, TransportConfig};
pub use error::ConfigError;
pub use paths::{config_dir, default_config_path, ensure_config_dir, find_config};
pub use validation::{ValidationError, ValidationResult, validate_config};
