//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use trama_config::{EngineConfig, default_config_path};
use trama_core::NodeFactory;
use trama_nodes::BuiltinProvider;

/// The config file a command should use.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(default_config_path, Path::to_path_buf)
}

/// Loads the configuration.
///
/// An explicitly named file must exist; the default location falls back to
/// built-in defaults when absent.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let path = config_path(explicit);
    let config = if explicit.is_some() {
        EngineConfig::load(&path)
    } else {
        EngineConfig::load_or_default(&path)
    };
    let config = config.with_context(|| format!("loading {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "configuration loaded");
    Ok(config)
}

/// Factory with every built-in node registered.
pub fn builtin_factory() -> Arc<NodeFactory> {
    let mut factory = NodeFactory::new();
    factory.register(BuiltinProvider::new());
    Arc::new(factory)
}
