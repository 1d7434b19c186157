//! Display WAV file metadata and levels.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use trama_core::{linear_to_db, rms};
use trama_io::{read_wav, read_wav_info};

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    file: PathBuf,

    /// Also decode the samples and report peak and RMS per channel
    #[arg(long)]
    levels: bool,
}

/// Peak and RMS of one channel of interleaved samples.
fn channel_levels(samples: &[f32], channels: usize, ch: usize) -> (f32, f32) {
    let channel: Vec<f32> = samples.iter().skip(ch).step_by(channels).copied().collect();
    let peak = channel.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    (peak, rms(&channel))
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let format = if info.is_float { "IEEE Float" } else { "PCM" };

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", format, info.spec.bits_per_sample);
    println!("Channels:    {}", info.spec.channels);
    println!("Sample Rate: {} Hz", info.spec.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    if args.levels {
        let (samples, spec) = read_wav(&args.file)?;
        let channels = usize::from(spec.channels.max(1));
        println!();
        println!("Levels:");
        for ch in 0..channels {
            let (peak, rms) = channel_levels(&samples, channels, ch);
            println!(
                "  ch {ch}  peak {:7.2} dB  rms {:7.2} dB",
                linear_to_db(peak),
                linear_to_db(rms)
            );
        }
    }
    Ok(())
}
