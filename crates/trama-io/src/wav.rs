//! WAV file reading and writing.
//!
//! Samples are interleaved `f32`. 32-bit files are written as IEEE float,
//! narrower ones as integer PCM.

use crate::Result;
use crate::offline::SampleSink;
use hound::{SampleFormat, WavReader, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// WAV file specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24 or 32).
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// 32-bit float stereo at `sample_rate`.
    pub fn stereo(sample_rate: u32) -> Self {
        Self {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
        }
    }
}

impl Default for WavSpec {
    fn default() -> Self {
        Self::stereo(48000)
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    /// Format.
    pub spec: WavSpec,
    /// True for IEEE float samples.
    pub is_float: bool,
    /// Sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));
    Ok(WavInfo {
        spec: spec.into(),
        is_float: spec.sample_format == SampleFormat::Float,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
    })
}

/// Read a WAV file as interleaved f32 samples.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());

    let samples = match reader.spec().sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok((samples, spec))
}

/// Write interleaved samples to a WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    let mut sink = WavSink::create(path, spec)?;
    sink.write(samples)?;
    sink.finalize()
}

/// Streaming WAV writer.
///
/// Call [`WavSink::finalize`] when done; dropping the sink also finalizes but
/// swallows errors.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    spec: WavSpec,
    frames: u64,
}

impl WavSink {
    /// Creates (or truncates) `path`.
    pub fn create<P: AsRef<Path>>(path: P, spec: WavSpec) -> Result<Self> {
        let writer = WavWriter::create(path, spec.into())?;
        Ok(Self {
            writer,
            spec,
            frames: 0,
        })
    }

    /// The file format.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Complete frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flushes the header and closes the file.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

impl SampleSink for WavSink {
    fn write(&mut self, samples: &[f32]) -> Result<()> {
        if self.spec.bits_per_sample == 32 {
            for &sample in samples {
                self.writer.write_sample(sample)?;
            }
        } else {
            let max_val = (1i64 << (self.spec.bits_per_sample - 1)) as f32;
            for &sample in samples {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                self.writer.write_sample(int_sample)?;
            }
        }
        self.frames = u64::from(self.writer.len()) / u64::from(self.spec.channels.max(1));
        Ok(())
    }
}
