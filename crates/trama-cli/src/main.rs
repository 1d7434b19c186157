//! Trama CLI - command-line front end for the trama render graph.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "trama")]
#[command(author, version, about = "Trama render graph CLI", long_about = None)]
struct Cli {
    /// Engine configuration file (defaults to the platform config dir, or $TRAMA_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the demo graph offline to a WAV file
    Render(commands::render::RenderArgs),

    /// List built-in node types and their ports
    Nodes(commands::nodes::NodesArgs),

    /// Show, create or check the engine configuration
    Config(commands::config::ConfigArgs),

    /// Display WAV file information
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Render(args) => commands::render::run(args, config_path.as_deref()),
        Commands::Nodes(args) => commands::nodes::run(args, config_path.as_deref()),
        Commands::Config(args) => commands::config::run(args, config_path.as_deref()),
        Commands::Info(args) => commands::info::run(args),
    }
}
