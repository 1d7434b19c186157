//! Offline render command.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use trama_config::EngineConfig;
use trama_core::{Engine, EngineSettings, GraphProcessor, NodeId, NodeKind, OversampleFactor};
use trama_io::{DriverSettings, OfflineDriver, WavSink, WavSpec};

use super::common::{builtin_factory, load_config};

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    output: PathBuf,

    /// Length in seconds
    #[arg(short, long, default_value = "2.0")]
    duration: f64,

    /// Oscillator frequency in Hz
    #[arg(short, long, default_value = "440.0")]
    frequency: f32,

    /// Oscillator level in dB
    #[arg(long, default_value = "-12.0", allow_negative_numbers = true)]
    level: f32,

    /// Output volume in dB (-30 mutes)
    #[arg(short, long, default_value = "0.0", allow_negative_numbers = true)]
    volume: f32,

    /// Sample rate override
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Block size override
    #[arg(long)]
    block_size: Option<usize>,

    /// Oversampling factor override (1, 2, 4 or 8)
    #[arg(long)]
    oversampling: Option<u32>,

    /// Output bit depth (16, 24 or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,

    /// Start the transport before rendering
    #[arg(long)]
    play: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

struct DemoGraph {
    oscillator: NodeId,
    volume: NodeId,
}

/// oscillator -> volume -> audio output, stereo throughout.
fn build_demo_graph(
    graph: &mut GraphProcessor,
    args: &RenderArgs,
    oversampling: OversampleFactor,
) -> anyhow::Result<DemoGraph> {
    let oscillator = graph.add_node_of_type("oscillator")?;
    let volume = graph.add_node_of_type("volume")?;
    let output = graph.add_io_node(NodeKind::AudioOutput)?;
    for ch in 0..2 {
        graph.add_connection(oscillator, ch, volume, ch)?;
        graph.add_connection(volume, 2 + ch, output, ch)?;
    }

    let set = |id: NodeId, index: usize, value: f32| {
        graph
            .node(id)
            .is_some_and(|node| node.set_parameter(index, value))
    };
    if !set(oscillator, 0, args.frequency) || !set(oscillator, 1, args.level) {
        tracing::warn!("oscillator parameters not applied");
    }
    if !set(volume, 0, args.volume) {
        tracing::warn!("volume parameter not applied");
    }

    if oversampling != OversampleFactor::X1 {
        for id in [oscillator, volume] {
            graph.set_oversampling(id, oversampling)?;
        }
    }
    Ok(DemoGraph { oscillator, volume })
}

fn apply_overrides(config: &mut EngineConfig, args: &RenderArgs) -> anyhow::Result<()> {
    if let Some(sample_rate) = args.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Some(oversampling) = args.oversampling {
        config.oversampling = oversampling;
    }
    config.validate().context("invalid render settings")?;
    Ok(())
}

pub fn run(args: RenderArgs, config: Option<&Path>) -> anyhow::Result<()> {
    if !args.duration.is_finite() || args.duration <= 0.0 {
        bail!("duration must be a positive number of seconds");
    }
    if !matches!(args.bit_depth, 16 | 24 | 32) {
        bail!("unsupported bit depth {} (use 16, 24 or 32)", args.bit_depth);
    }

    let mut config = load_config(config)?;
    apply_overrides(&mut config, &args)?;

    let sample_rate = f64::from(config.sample_rate);
    let total_frames = (args.duration * sample_rate).round() as u64;

    let (mut engine, renderer) = Engine::new(EngineSettings::from(&config), Some(builtin_factory()));
    let demo = build_demo_graph(engine.graph_mut(), &args, config.oversampling_factor())?;
    engine
        .prepare_to_play(sample_rate, config.block_size)
        .context("preparing engine")?;
    for event in engine.graph_mut().take_events() {
        tracing::debug!(?event, "graph event");
    }
    if args.play {
        engine
            .transport()
            .request_play_state(true)
            .context("starting transport")?;
    }

    println!("Rendering demo graph -> {}", args.output.display());
    println!(
        "  {:.1} Hz at {:.1} dB, volume {:.1} dB",
        args.frequency, args.level, args.volume
    );
    println!(
        "  {} Hz, block {}, oversampling {}x, {} frames",
        config.sample_rate,
        config.block_size,
        config.oversampling_factor().factor(),
        total_frames
    );

    let spec = WavSpec {
        bits_per_sample: args.bit_depth,
        ..WavSpec::stereo(config.sample_rate)
    };
    let mut sink = WavSink::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let driver = OfflineDriver::new(DriverSettings {
        block_size: config.block_size,
        midi_capacity: config.midi_event_capacity,
        ..DriverSettings::default()
    });

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total_frames)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let (_renderer, summary) = driver
        .run(renderer, total_frames, &mut sink, |frames| {
            pb.set_position(frames);
            if let Err(e) = engine.graph_mut().poll() {
                tracing::warn!(error = %e, "graph poll failed");
            }
        })
        .context("rendering")?;
    pb.finish_with_message("done");

    sink.finalize()
        .with_context(|| format!("finalizing {}", args.output.display()))?;

    let stats = engine.graph().render_stats();
    let monitor = engine.transport().monitor();
    println!();
    println!("Stats:");
    println!(
        "  Frames:     {} ({:.2}s)",
        summary.frames,
        summary.frames as f64 / sample_rate
    );
    println!("  Blocks:     {}", summary.blocks);
    println!("  Plan swaps: {}", stats.plan_swaps);
    println!("  Busy skips: {}", stats.busy_skips);
    println!("  Latency:    {} samples", engine.graph().total_latency());
    println!(
        "  Transport:  {} at frame {}",
        if monitor.is_playing() { "playing" } else { "stopped" },
        monitor.position_frames()
    );
    tracing::debug!(
        oscillator = ?demo.oscillator,
        volume = ?demo.volume,
        ?stats,
        "render complete"
    );

    if summary.stopped {
        bail!("render stopped after {} of {total_frames} frames", summary.frames);
    }
    println!("Done.");
    Ok(())
}
