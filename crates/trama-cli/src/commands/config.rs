//! Engine configuration command.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use trama_config::EngineConfig;

use super::common::{config_path, load_config};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Print the configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Parse and validate a configuration file
    Check {
        /// File to check (defaults to the active configuration file)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub fn run(args: ConfigArgs, config: Option<&Path>) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Show => {
            let engine_config = load_config(config)?;
            print!("{}", engine_config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path(config).display());
        }
        ConfigAction::Init { force } => {
            let path = config_path(config);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            EngineConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Check { file } => {
            let path = file.unwrap_or_else(|| config_path(config));
            EngineConfig::load(&path).with_context(|| format!("checking {}", path.display()))?;
            println!("{}: ok", path.display());
        }
    }
    Ok(())
}
