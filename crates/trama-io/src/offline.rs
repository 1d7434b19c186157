//! Offline render driver.
//!
//! Stands in for a hardware callback: a dedicated thread owns the
//! [`EngineRenderer`] and calls it once per block into preallocated buffers.
//! Interleaved output crosses back to the calling thread over an `rtrb` ring,
//! so the render thread never allocates or takes a lock. The calling thread
//! drains the ring into a [`SampleSink`] and runs a progress callback between
//! drains, where it is free to edit the graph or move the transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rtrb::RingBuffer;
use trama_core::{AudioBuffer, EngineRenderer, HostIo, MidiBuffer};

use crate::{Error, Result};

/// Destination for interleaved output.
pub trait SampleSink {
    /// Appends interleaved samples.
    fn write(&mut self, samples: &[f32]) -> Result<()>;
}

impl SampleSink for Vec<f32> {
    fn write(&mut self, samples: &[f32]) -> Result<()> {
        self.extend_from_slice(samples);
        Ok(())
    }
}

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    /// Frames per callback.
    pub block_size: usize,
    /// Host input channels (fed silence).
    pub input_channels: usize,
    /// Host output channels written to the sink.
    pub output_channels: usize,
    /// Blocks the output ring holds.
    pub ring_blocks: usize,
    /// MIDI events per host buffer.
    pub midi_capacity: usize,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            block_size: 512,
            input_channels: 2,
            output_channels: 2,
            ring_blocks: 16,
            midi_capacity: 512,
        }
    }
}

/// Counters from a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Frames delivered to the sink.
    pub frames: u64,
    /// Render callbacks made.
    pub blocks: u64,
    /// True if the run was stopped before `total_frames`.
    pub stopped: bool,
}

/// Requests an early stop from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Asks the render thread to stop after its current block.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives an [`EngineRenderer`] faster than real time.
#[derive(Debug)]
pub struct OfflineDriver {
    settings: DriverSettings,
    stop: Arc<AtomicBool>,
}

impl OfflineDriver {
    /// Creates a driver.
    pub fn new(settings: DriverSettings) -> Self {
        Self {
            settings,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Settings in use.
    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// A handle that cancels a run in progress.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Renders `total_frames` frames into `sink`.
    ///
    /// `on_progress` runs on the calling thread with the frames written so
    /// far, after every drain of the ring. The renderer is returned so the
    /// caller can keep using it.
    pub fn run<S, F>(
        &self,
        renderer: EngineRenderer,
        total_frames: u64,
        sink: &mut S,
        mut on_progress: F,
    ) -> Result<(EngineRenderer, RenderSummary)>
    where
        S: SampleSink + ?Sized,
        F: FnMut(u64),
    {
        let settings = self.settings;
        if settings.block_size == 0 || settings.output_channels == 0 || settings.ring_blocks == 0 {
            return Err(Error::InvalidSettings(format!("{settings:?}")));
        }
        self.stop.store(false, Ordering::Release);

        let block_samples = settings.block_size * settings.output_channels;
        let (mut producer, mut consumer) = RingBuffer::<f32>::new(block_samples * settings.ring_blocks);
        let stop = Arc::clone(&self.stop);
        let total_samples = total_frames.saturating_mul(settings.output_channels as u64);

        tracing::debug!(
            total_frames,
            block_size = settings.block_size,
            channels = settings.output_channels,
            "offline render starting"
        );

        thread::scope(|scope| {
            let render = thread::Builder::new()
                .name("trama-render".into())
                .spawn_scoped(scope, move || {
                    render_loop(renderer, settings, total_frames, &mut producer, &stop)
                })?;

            let mut written: u64 = 0;
            let mut failure = None;
            let mut scratch = vec![0.0_f32; block_samples];
            loop {
                let available = consumer.slots().min(scratch.len());
                if available > 0 {
                    // Whole frames only.
                    let take = available - available % settings.output_channels;
                    if take > 0
                        && let Ok(chunk) = consumer.read_chunk(take)
                    {
                        let (first, second) = chunk.as_slices();
                        scratch[..first.len()].copy_from_slice(first);
                        scratch[first.len()..take].copy_from_slice(second);
                        chunk.commit_all();
                        if let Err(e) = sink.write(&scratch[..take]) {
                            self.stop.store(true, Ordering::Release);
                            failure = Some(e);
                            break;
                        }
                        written += take as u64;
                        on_progress(written / settings.output_channels as u64);
                        continue;
                    }
                }
                // A stopped render thread may leave a partial frame behind.
                let finished = render.is_finished();
                let drained = consumer.slots() < settings.output_channels;
                if written >= total_samples || (finished && drained) {
                    break;
                }
                thread::sleep(Duration::from_micros(200));
            }

            let joined = render.join().map_err(|_| Error::RenderThread);
            if let Some(e) = failure {
                return Err(e);
            }
            let (renderer, blocks) = joined?;
            let frames = written / settings.output_channels as u64;
            let summary = RenderSummary {
                frames,
                blocks,
                stopped: frames < total_frames,
            };
            tracing::debug!(?summary, "offline render finished");
            Ok((renderer, summary))
        })
    }
}

/// Render thread body. Returns the renderer and the number of callbacks.
fn render_loop(
    mut renderer: EngineRenderer,
    settings: DriverSettings,
    total_frames: u64,
    producer: &mut rtrb::Producer<f32>,
    stop: &AtomicBool,
) -> (EngineRenderer, u64) {
    let audio_in = AudioBuffer::new(settings.input_channels, settings.block_size);
    let mut audio_out = AudioBuffer::new(settings.output_channels, settings.block_size);
    let midi_in = MidiBuffer::with_capacity(settings.midi_capacity);
    let mut midi_out = MidiBuffer::with_capacity(settings.midi_capacity);
    let mut interleaved = vec![0.0_f32; settings.block_size * settings.output_channels];

    let mut rendered: u64 = 0;
    let mut blocks: u64 = 0;
    while rendered < total_frames && !stop.load(Ordering::Acquire) {
        let frames = (total_frames - rendered).min(settings.block_size as u64) as usize;
        {
            let mut io = HostIo {
                audio_in: &audio_in,
                audio_out: &mut audio_out,
                midi_in: &midi_in,
                midi_out: &mut midi_out,
            };
            renderer.process(frames, &mut io);
        }
        let samples = frames * settings.output_channels;
        audio_out.write_interleaved(&mut interleaved[..samples], frames);

        let mut pushed = 0;
        while pushed < samples {
            if stop.load(Ordering::Acquire) {
                return (renderer, blocks + 1);
            }
            let free = producer.slots().min(samples - pushed);
            if free == 0 {
                thread::yield_now();
                continue;
            }
            if let Ok(chunk) = producer.write_chunk_uninit(free) {
                pushed += chunk.fill_from_iter(interleaved[pushed..samples].iter().copied());
            }
        }
        rendered += frames as u64;
        blocks += 1;
    }
    (renderer, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trama_core::{Engine, EngineSettings, NodeKind, PortCount, PortType, ProcessBlock, Processor};

    struct Ramp(f32);

    impl Processor for Ramp {
        fn name(&self) -> &str {
            "Ramp"
        }

        fn ports(&self, _: f64, _: usize) -> PortCount {
            PortCount::new().with(PortType::Audio, 0, 2)
        }

        fn process(&mut self, block: &mut ProcessBlock<'_>) {
            let start = self.0;
            for ch in 0..2 {
                for (i, s) in block.output(ch).iter_mut().enumerate() {
                    *s = start + i as f32;
                }
            }
            self.0 += block.frames as f32;
        }
    }

    fn engine(block: usize) -> (Engine, EngineRenderer) {
        let (mut engine, renderer) = Engine::new(EngineSettings::default(), None);
        let graph = engine.graph_mut();
        let src = graph.add_node(Box::new(Ramp(0.0)));
        let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
        graph.add_connection(src, 0, out, 0).unwrap();
        graph.add_connection(src, 1, out, 1).unwrap();
        engine.prepare_to_play(48000.0, block).unwrap();
        (engine, renderer)
    }

    #[test]
    fn renders_exact_frame_count_in_order() {
        let (_engine, renderer) = engine(64);
        let driver = OfflineDriver::new(DriverSettings {
            block_size: 64,
            ring_blocks: 2,
            ..DriverSettings::default()
        });
        let mut out: Vec<f32> = Vec::new();
        let mut last_progress = 0;
        let (_, summary) = driver
            .run(renderer, 1000, &mut out, |frames| {
                assert!(frames >= last_progress);
                last_progress = frames;
            })
            .unwrap();

        assert_eq!(summary.frames, 1000);
        assert_eq!(summary.blocks, 16);
        assert!(!summary.stopped);
        assert_eq!(last_progress, 1000);
        assert_eq!(out.len(), 2000);
        for (frame, pair) in out.chunks(2).enumerate() {
            assert_eq!(pair, [frame as f32, frame as f32]);
        }
    }

    #[test]
    fn stop_handle_ends_run_early() {
        let (_engine, renderer) = engine(64);
        let driver = OfflineDriver::new(DriverSettings {
            block_size: 64,
            ..DriverSettings::default()
        });
        let stop = driver.stop_handle();
        let mut out: Vec<f32> = Vec::new();
        let (_, summary) = driver
            .run(renderer, 10_000_000, &mut out, |frames| {
                if frames >= 640 {
                    stop.stop();
                }
            })
            .unwrap();
        assert!(summary.stopped);
        assert!(summary.frames < 10_000_000);
        assert!(stop.is_stopped());
    }

    #[test]
    fn rejects_zero_block() {
        let (_engine, renderer) = engine(64);
        let driver = OfflineDriver::new(DriverSettings {
            block_size: 0,
            ..DriverSettings::default()
        });
        assert!(matches!(
            driver.run(renderer, 10, &mut Vec::<f32>::new(), |_| {}),
            Err(Error::InvalidSettings(_))
        ));
    }
}
