//! Audio output for the trama render graph.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`write_wav`], [`read_wav`] and the streaming [`WavSink`]
//! - **Offline rendering**: [`OfflineDriver`] runs an [`EngineRenderer`] on its
//!   own thread, block by block, the way a hardware callback would, and hands
//!   the interleaved output back to the calling thread through a ring buffer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trama_core::{Engine, EngineSettings};
//! use trama_io::{DriverSettings, OfflineDriver, WavSink, WavSpec};
//!
//! let (mut engine, renderer) = Engine::new(EngineSettings::default(), None);
//! engine.prepare_to_play(48000.0, 512).unwrap();
//!
//! let mut sink = WavSink::create("out.wav", WavSpec::stereo(48000)).unwrap();
//! let driver = OfflineDriver::new(DriverSettings::default());
//! let (_renderer, summary) = driver
//!     .run(renderer, 48000, &mut sink, |_frames| {})
//!     .unwrap();
//! sink.finalize().unwrap();
//! println!("{} blocks", summary.blocks);
//! ```
//!
//! [`EngineRenderer`]: trama_core::EngineRenderer

mod offline;
mod wav;

pub use offline::{DriverSettings, OfflineDriver, RenderSummary, SampleSink, StopHandle};
pub use wav::{WavInfo, WavSink, WavSpec, read_wav, read_wav_info, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver settings cannot be used.
    #[error("invalid driver settings: {0}")]
    InvalidSettings(String),

    /// The render thread panicked.
    #[error("render thread panicked")]
    RenderThread,
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
