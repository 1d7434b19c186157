//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/trama/`
//! - macOS: `~/Library/Application Support/trama/`
//! - Windows: `%APPDATA%\trama\`
//!
//! # Example
//!
//! ```rust,no_run
//! use trama_config::{EngineConfig, paths};
//!
//! let config = EngineConfig::load_or_default(paths::default_config_path()).unwrap();
//! println!("block size: {}", config.block_size);
//! ```

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "trama";

/// File name of the engine configuration.
pub const CONFIG_FILE: &str = "engine.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV: &str = "TRAMA_CONFIG";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the engine configuration file.
///
/// `TRAMA_CONFIG` wins when set and non-empty.
pub fn default_config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => config_dir().join(CONFIG_FILE),
    }
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir();
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }
    Ok(())
}

/// Resolve a configuration by file path or by name inside [`config_dir`].
///
/// A name without an extension gets `.toml` appended.
pub fn find_config(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let user_path = config_dir().join(filename);
    user_path.is_file().then_some(user_path)
}
