//! Sample-accurate transport: play/record state, tempo, meter, position.
//!
//! The transport is split across the two threads:
//!
//! - [`TransportHandle`] (control thread) issues `request_*` calls. Each one
//!   publishes into an [`AtomicValue`] and never touches live state.
//! - [`Transport`] (render thread) applies requests at block boundaries:
//!   [`pre_process`](Transport::pre_process) applies a sample-rate change and
//!   latches play/record for the block,
//!   [`post_process`](Transport::post_process) advances the position, applies
//!   tempo, meter, seek and loop changes, then publishes to the [`Monitor`].
//!
//! Tempo is in quarter notes per minute. A beat is one `1 / beat_unit` note,
//! where `beat_unit = 1 << beat_divisor`.
//!
//! # Example
//!
//! ```rust
//! use trama_core::{Transport, TransportSettings};
//!
//! let mut transport = Transport::new(&TransportSettings::default());
//! let handle = transport.handle();
//!
//! handle.request_audio_frame(48_000).unwrap();
//! transport.pre_process(256);
//! transport.post_process(256);
//!
//! assert_eq!(handle.monitor().position_frames(), 48_000);
//! ```

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use libm::floor;

use crate::atomic::{AtomicBits, AtomicValue, Contention, DEFAULT_RETRY_LIMIT, SpinLock};

/// Ticks per quarter note.
pub const PPQ: u32 = 1920;

/// Tempo used until a request arrives.
pub const DEFAULT_TEMPO: f32 = 120.0;

/// Lowest accepted tempo in BPM.
pub const MIN_TEMPO: f32 = 20.0;

/// Highest accepted tempo in BPM.
pub const MAX_TEMPO: f32 = 999.0;

/// Sample rate assumed before the engine is prepared.
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Transport run state. Recording implies playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    /// Position is frozen.
    #[default]
    Stopped,
    /// Position advances every block.
    Playing,
    /// Playing with record enabled.
    Recording,
}

impl PlayState {
    fn from_flags(playing: bool, recording: bool) -> Self {
        match (playing, recording) {
            (false, _) => PlayState::Stopped,
            (true, false) => PlayState::Playing,
            (true, true) => PlayState::Recording,
        }
    }
}

/// Time signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Meter {
    /// Beats per bar (numerator).
    pub beats_per_bar: u16,
    /// Beat unit exponent: the denominator is `1 << beat_divisor`.
    pub beat_divisor: u16,
}

impl Meter {
    /// Largest accepted divisor (1/128 notes).
    pub const MAX_DIVISOR: u16 = 7;

    /// Creates a meter, clamping to at least one beat and a valid divisor.
    pub fn new(beats_per_bar: u16, beat_divisor: u16) -> Self {
        Self {
            beats_per_bar: beats_per_bar.max(1),
            beat_divisor: beat_divisor.min(Self::MAX_DIVISOR),
        }
    }

    /// Denominator of the time signature.
    pub fn beat_unit(&self) -> u32 {
        1 << self.beat_divisor.min(Self::MAX_DIVISOR)
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new(4, 2)
    }
}

impl AtomicBits for Meter {
    fn to_bits(self) -> u64 {
        (u64::from(self.beats_per_bar) << 16) | u64::from(self.beat_divisor)
    }

    fn from_bits(bits: u64) -> Self {
        Self {
            beats_per_bar: (bits >> 16) as u16,
            beat_divisor: bits as u16,
        }
    }
}

/// Musical position, zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarBeatTick {
    /// Bar index.
    pub bar: i64,
    /// Beat within the bar.
    pub beat: u16,
    /// Tick within the beat, in [`PPQ`] resolution scaled to the beat unit.
    pub tick: u32,
}

/// Frames per beat at a sample rate, tempo and meter.
#[inline]
pub fn frames_per_beat(sample_rate: f64, tempo: f32, meter: Meter) -> f64 {
    let quarter = sample_rate * 60.0 / f64::from(tempo.max(MIN_TEMPO));
    quarter * 4.0 / f64::from(meter.beat_unit())
}

/// Transport state for one render block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeInfo {
    /// Frame position at the start of the block.
    pub frame: i64,
    /// Engine sample rate.
    pub sample_rate: f64,
    /// Tempo in BPM.
    pub tempo: f32,
    /// Time signature.
    pub meter: Meter,
    /// Transport is rolling.
    pub playing: bool,
    /// Transport is recording.
    pub recording: bool,
}

impl Default for TimeInfo {
    fn default() -> Self {
        Self {
            frame: 0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            tempo: DEFAULT_TEMPO,
            meter: Meter::default(),
            playing: false,
            recording: false,
        }
    }
}

impl TimeInfo {
    /// Frames per beat at this tempo and meter.
    pub fn frames_per_beat(&self) -> f64 {
        frames_per_beat(self.sample_rate, self.tempo, self.meter)
    }

    /// Position in seconds.
    pub fn seconds(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    /// Position in beats.
    pub fn beats(&self) -> f64 {
        self.frame as f64 / self.frames_per_beat()
    }

    /// Position as bar / beat / tick.
    pub fn bar_beat_tick(&self) -> BarBeatTick {
        let beats = self.beats();
        let whole = floor(beats);
        let bpb = i64::from(self.meter.beats_per_bar.max(1));
        let whole_beats = whole as i64;
        let ticks_per_beat = f64::from(PPQ) * 4.0 / f64::from(self.meter.beat_unit());
        BarBeatTick {
            bar: whole_beats.div_euclid(bpb),
            beat: whole_beats.rem_euclid(bpb) as u16,
            tick: ((beats - whole) * ticks_per_beat) as u32,
        }
    }

    /// Run state.
    pub fn play_state(&self) -> PlayState {
        PlayState::from_flags(self.playing, self.recording)
    }
}

/// Initial transport configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportSettings {
    /// Sample rate.
    pub sample_rate: f64,
    /// Tempo in BPM.
    pub tempo: f32,
    /// Time signature.
    pub meter: Meter,
    /// Retry bound for control-thread requests.
    pub retry_limit: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            tempo: DEFAULT_TEMPO,
            meter: Meter::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

/// Read-only transport snapshot, safe to poll from any thread.
///
/// Fields are individually consistent; two fields are not guaranteed to come
/// from the same block.
#[derive(Debug)]
pub struct Monitor {
    position_frames: AtomicValue<i64>,
    playing: AtomicValue<bool>,
    recording: AtomicValue<bool>,
    tempo: AtomicValue<f32>,
    meter: AtomicValue<Meter>,
    sample_rate: AtomicValue<f64>,
}

impl Monitor {
    fn new(settings: &TransportSettings) -> Self {
        Self {
            position_frames: AtomicValue::new(0),
            playing: AtomicValue::new(false),
            recording: AtomicValue::new(false),
            tempo: AtomicValue::new(settings.tempo),
            meter: AtomicValue::new(settings.meter),
            sample_rate: AtomicValue::new(settings.sample_rate),
        }
    }

    /// Frame position after the last rendered block.
    pub fn position_frames(&self) -> i64 {
        self.position_frames.get()
    }

    /// Transport is rolling.
    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    /// Transport is recording.
    pub fn is_recording(&self) -> bool {
        self.recording.get()
    }

    /// Tempo in BPM.
    pub fn tempo(&self) -> f32 {
        self.tempo.get()
    }

    /// Beats per bar.
    pub fn beats_per_bar(&self) -> u16 {
        self.meter.get().beats_per_bar
    }

    /// Beat divisor exponent.
    pub fn beat_divisor(&self) -> u16 {
        self.meter.get().beat_divisor
    }

    /// Time signature.
    pub fn meter(&self) -> Meter {
        self.meter.get()
    }

    /// Sample rate the position is counted in.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.get()
    }

    /// Run state.
    pub fn play_state(&self) -> PlayState {
        PlayState::from_flags(self.is_playing(), self.is_recording())
    }

    /// Field-by-field snapshot.
    pub fn time_info(&self) -> TimeInfo {
        TimeInfo {
            frame: self.position_frames(),
            sample_rate: self.sample_rate(),
            tempo: self.tempo(),
            meter: self.meter(),
            playing: self.is_playing(),
            recording: self.is_recording(),
        }
    }
}

#[derive(Debug)]
struct Requests {
    play: AtomicValue<bool>,
    record: AtomicValue<bool>,
    tempo: AtomicValue<f32>,
    meter: AtomicValue<Meter>,
    sample_rate: AtomicValue<f64>,
    seek_frame: AtomicValue<i64>,
    seek_serial: AtomicU64,
    loop_request: SpinLock<LoopRequest>,
}

/// Loop bounds and the serial of the request that wrote them, kept together.
#[derive(Clone, Copy, Debug, Default)]
struct LoopRequest {
    start: i64,
    end: i64,
    serial: u64,
}

#[derive(Debug)]
struct Shared {
    requests: Requests,
    monitor: Monitor,
}

/// Control-thread side of the transport.
#[derive(Clone, Debug)]
pub struct TransportHandle {
    shared: Arc<Shared>,
    retry_limit: u32,
}

impl TransportHandle {
    /// Start or stop playback.
    pub fn request_play_state(&self, playing: bool) -> Result<(), Contention> {
        self.shared
            .requests
            .play
            .set_with_retry(playing, self.retry_limit)
    }

    /// Arm or disarm recording. Recording starts once the transport plays.
    pub fn request_record_state(&self, recording: bool) -> Result<(), Contention> {
        self.shared
            .requests
            .record
            .set_with_retry(recording, self.retry_limit)
    }

    /// Toggle the requested play state.
    pub fn request_play_pause(&self) -> Result<(), Contention> {
        let playing = self.shared.requests.play.get();
        self.request_play_state(!playing)
    }

    /// Change tempo, clamped to [`MIN_TEMPO`]..=[`MAX_TEMPO`].
    pub fn request_tempo(&self, bpm: f32) -> Result<(), Contention> {
        self.shared
            .requests
            .tempo
            .set_with_retry(bpm.clamp(MIN_TEMPO, MAX_TEMPO), self.retry_limit)
    }

    /// Change the time signature.
    pub fn request_meter(&self, beats_per_bar: u16, beat_divisor: u16) -> Result<(), Contention> {
        self.shared
            .requests
            .meter
            .set_with_retry(Meter::new(beats_per_bar, beat_divisor), self.retry_limit)
    }

    /// Jump to an absolute frame at the end of the next block.
    pub fn request_audio_frame(&self, frame: i64) -> Result<(), Contention> {
        let requests = &self.shared.requests;
        requests.seek_frame.set_with_retry(frame, self.retry_limit)?;
        requests.seek_serial.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Loop playback over `start..end`. An empty range disables looping.
    pub fn request_loop(&self, start: i64, end: i64) -> Result<(), Contention> {
        let mut request = self.shared.requests.loop_request.lock();
        request.start = start;
        request.end = end;
        request.serial += 1;
        Ok(())
    }

    /// Disable looping.
    pub fn clear_loop(&self) -> Result<(), Contention> {
        self.request_loop(0, 0)
    }

    pub(crate) fn request_sample_rate(&self, sample_rate: f64) -> Result<(), Contention> {
        self.shared
            .requests
            .sample_rate
            .set_with_retry(sample_rate, self.retry_limit)
    }

    /// Play state most recently requested.
    pub fn requested_play_state(&self) -> bool {
        self.shared.requests.play.get()
    }

    /// Read-only view of the live transport.
    pub fn monitor(&self) -> &Monitor {
        &self.shared.monitor
    }
}

/// Render-thread side of the transport.
#[derive(Debug)]
pub struct Transport {
    shared: Arc<Shared>,
    retry_limit: u32,
    sample_rate: f64,
    tempo: f32,
    meter: Meter,
    frames_per_beat: f64,
    position: i64,
    playing: bool,
    recording: bool,
    loop_range: Option<(i64, i64)>,
    seek_serial: u64,
    loop_serial: u64,
    block_frames: usize,
}

impl Transport {
    /// Creates a stopped transport at frame zero.
    pub fn new(settings: &TransportSettings) -> Self {
        let tempo = settings.tempo.clamp(MIN_TEMPO, MAX_TEMPO);
        let shared = Arc::new(Shared {
            requests: Requests {
                play: AtomicValue::new(false),
                record: AtomicValue::new(false),
                tempo: AtomicValue::new(tempo),
                meter: AtomicValue::new(settings.meter),
                sample_rate: AtomicValue::new(settings.sample_rate),
                seek_frame: AtomicValue::new(0),
                seek_serial: AtomicU64::new(0),
                loop_request: SpinLock::new(LoopRequest::default()),
            },
            monitor: Monitor::new(settings),
        });
        Self {
            shared,
            retry_limit: settings.retry_limit,
            sample_rate: settings.sample_rate,
            tempo,
            meter: settings.meter,
            frames_per_beat: frames_per_beat(settings.sample_rate, tempo, settings.meter),
            position: 0,
            playing: false,
            recording: false,
            loop_range: None,
            seek_serial: 0,
            loop_serial: 0,
            block_frames: 0,
        }
    }

    /// A control-thread handle sharing this transport's requests and monitor.
    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            shared: Arc::clone(&self.shared),
            retry_limit: self.retry_limit,
        }
    }

    /// Applies a pending sample-rate change and latches the requested
    /// play/record state for the coming block.
    pub fn pre_process(&mut self, frames: usize) {
        let requests = &self.shared.requests;
        let sample_rate = requests.sample_rate.get();
        let playing = requests.play.get();
        let recording = playing && requests.record.get();

        if sample_rate > 0.0 && sample_rate != self.sample_rate {
            self.apply_sample_rate(sample_rate);
        }
        self.playing = playing;
        self.recording = recording;
        self.block_frames = frames;
    }

    /// Advances and applies pending requests after the block, then publishes.
    pub fn post_process(&mut self, frames: usize) {
        debug_assert_eq!(frames, self.block_frames, "pre/post block size mismatch");
        if self.playing {
            self.advance(frames);
        }

        let shared = Arc::clone(&self.shared);
        let requests = &shared.requests;

        let tempo = requests.tempo.get();
        if tempo != self.tempo {
            self.apply_tempo(tempo);
        }

        let meter = requests.meter.get();
        if meter != self.meter {
            self.meter = meter;
            self.frames_per_beat = frames_per_beat(self.sample_rate, self.tempo, self.meter);
        }

        let serial = requests.seek_serial.load(Ordering::Acquire);
        if serial != self.seek_serial {
            self.seek_serial = serial;
            self.position = requests.seek_frame.get();
        }

        // A writer holding the lock is picked up on a later block.
        let pending = requests.loop_request.try_lock().map(|request| *request);
        if let Some(request) = pending
            && request.serial != self.loop_serial
        {
            self.loop_serial = request.serial;
            self.loop_range = (request.end > request.start).then_some((request.start, request.end));
        }

        self.publish();
    }

    fn advance(&mut self, frames: usize) {
        let next = self.position + frames as i64;
        self.position = match self.loop_range {
            Some((start, end)) if self.position < end && next >= end => {
                start + (next - end) % (end - start)
            }
            _ => next,
        };
    }

    /// Tempo change keeps the musical position.
    fn apply_tempo(&mut self, tempo: f32) {
        let old = self.frames_per_beat;
        self.tempo = tempo;
        self.frames_per_beat = frames_per_beat(self.sample_rate, self.tempo, self.meter);
        let scale = self.frames_per_beat / old;
        self.rescale(scale);
    }

    /// Sample-rate change keeps the position in seconds.
    fn apply_sample_rate(&mut self, sample_rate: f64) {
        let scale = sample_rate / self.sample_rate;
        self.sample_rate = sample_rate;
        self.frames_per_beat = frames_per_beat(self.sample_rate, self.tempo, self.meter);
        self.rescale(scale);
    }

    fn rescale(&mut self, scale: f64) {
        let scale_frame = |f: i64| (f as f64 * scale).round() as i64;
        self.position = scale_frame(self.position);
        self.loop_range = self
            .loop_range
            .map(|(start, end)| (scale_frame(start), scale_frame(end)));
    }

    fn publish(&self) {
        let monitor = &self.shared.monitor;
        monitor.position_frames.set(self.position);
        monitor.playing.set(self.playing);
        monitor.recording.set(self.recording);
        monitor.tempo.set(self.tempo);
        monitor.meter.set(self.meter);
        monitor.sample_rate.set(self.sample_rate);
    }

    /// Frame position.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Rolling this block.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Recording this block.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Tempo in BPM.
    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Frames per beat.
    pub fn frames_per_beat(&self) -> f64 {
        self.frames_per_beat
    }

    /// Active loop range, if any.
    pub fn loop_range(&self) -> Option<(i64, i64)> {
        self.loop_range
    }

    /// Snapshot for the block being rendered.
    pub fn time_info(&self) -> TimeInfo {
        TimeInfo {
            frame: self.position,
            sample_rate: self.sample_rate,
            tempo: self.tempo,
            meter: self.meter,
            playing: self.playing,
            recording: self.recording,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 512;

    fn cycle(transport: &mut Transport) {
        transport.pre_process(BLOCK);
        transport.post_process(BLOCK);
    }

    fn at_48k() -> Transport {
        Transport::new(&TransportSettings {
            sample_rate: 48_000.0,
            ..TransportSettings::default()
        })
    }

    #[test]
    fn seek_lands_after_one_cycle() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_audio_frame(48_000).unwrap();
        assert_eq!(handle.monitor().position_frames(), 0);
        cycle(&mut transport);
        assert_eq!(handle.monitor().position_frames(), 48_000);
        cycle(&mut transport);
        assert_eq!(transport.position(), 48_000, "stopped transport must not move");
    }

    #[test]
    fn seek_wins_over_advance_in_same_block() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_play_state(true).unwrap();
        handle.request_audio_frame(1000).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.position(), 1000);
        cycle(&mut transport);
        assert_eq!(transport.position(), 1000 + BLOCK as i64);
    }

    #[test]
    fn play_state_latches_in_pre_process() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_play_state(true).unwrap();
        assert!(!transport.is_playing());
        transport.pre_process(BLOCK);
        assert!(transport.is_playing());
        handle.request_play_state(false).unwrap();
        assert!(transport.is_playing(), "mid-block state must stay stable");
        transport.post_process(BLOCK);
        assert_eq!(transport.position(), BLOCK as i64);
        assert!(handle.monitor().is_playing());
    }

    #[test]
    fn recording_requires_playing() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_record_state(true).unwrap();
        cycle(&mut transport);
        assert_eq!(handle.monitor().play_state(), PlayState::Stopped);
        handle.request_play_state(true).unwrap();
        cycle(&mut transport);
        assert_eq!(handle.monitor().play_state(), PlayState::Recording);
    }

    #[test]
    fn play_pause_toggles() {
        let transport = at_48k();
        let handle = transport.handle();
        handle.request_play_pause().unwrap();
        assert!(handle.requested_play_state());
        handle.request_play_pause().unwrap();
        assert!(!handle.requested_play_state());
    }

    #[test]
    fn tempo_change_keeps_beat_position() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_audio_frame(48_000).unwrap();
        cycle(&mut transport);
        let beats = transport.time_info().beats();
        assert!((beats - 2.0).abs() < 1e-9);

        handle.request_tempo(60.0).unwrap();
        cycle(&mut transport);
        assert_eq!(handle.monitor().tempo(), 60.0);
        assert_eq!(transport.position(), 96_000);
        assert!((transport.time_info().beats() - beats).abs() < 1e-9);
    }

    #[test]
    fn tempo_request_is_clamped() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_tempo(5000.0).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.tempo(), MAX_TEMPO);
    }

    #[test]
    fn meter_change_rescales_beats() {
        let mut transport = at_48k();
        let handle = transport.handle();
        assert_eq!(transport.frames_per_beat(), 24_000.0);
        handle.request_meter(6, 3).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.frames_per_beat(), 12_000.0);
        assert_eq!(handle.monitor().beats_per_bar(), 6);
        assert_eq!(handle.monitor().beat_divisor(), 3);
        assert_eq!(handle.monitor().meter().beat_unit(), 8);
    }

    #[test]
    fn sample_rate_change_keeps_seconds() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_audio_frame(48_000).unwrap();
        cycle(&mut transport);
        handle.request_sample_rate(96_000.0).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.position(), 96_000);
        assert!((transport.time_info().seconds() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sample_rate_change_applies_before_block_advances() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_play_state(true).unwrap();
        handle.request_sample_rate(44_100.0).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.position(), BLOCK as i64);
        cycle(&mut transport);
        assert_eq!(handle.monitor().position_frames(), 2 * BLOCK as i64);
        assert_eq!(handle.monitor().sample_rate(), 44_100.0);
    }

    #[test]
    fn loop_bounds_apply_together() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_loop(100, 900).unwrap();
        let shared = Arc::clone(&transport.shared);
        {
            let _writer = shared.requests.loop_request.lock();
            cycle(&mut transport);
            assert_eq!(transport.loop_range(), None);
        }
        cycle(&mut transport);
        assert_eq!(transport.loop_range(), Some((100, 900)));

        handle.request_loop(2000, 4000).unwrap();
        handle.request_loop(10, 20).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.loop_range(), Some((10, 20)));
    }

    #[test]
    fn loop_wraps_while_playing() {
        let mut transport = at_48k();
        let handle = transport.handle();
        handle.request_loop(0, 1000).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.loop_range(), Some((0, 1000)));

        handle.request_play_state(true).unwrap();
        cycle(&mut transport);
        assert_eq!(transport.position(), 512);
        cycle(&mut transport);
        assert_eq!(transport.position(), 24);

        handle.clear_loop().unwrap();
        cycle(&mut transport);
        assert_eq!(transport.loop_range(), None);
    }

    #[test]
    fn bar_beat_tick_in_four_four() {
        let info = TimeInfo {
            frame: 5 * 24_000 + 12_000,
            sample_rate: 48_000.0,
            ..TimeInfo::default()
        };
        let bbt = info.bar_beat_tick();
        assert_eq!(bbt.bar, 1);
        assert_eq!(bbt.beat, 1);
        assert_eq!(bbt.tick, PPQ / 2);
    }

    #[test]
    fn meter_bits_round_trip() {
        let meter = Meter::new(7, 3);
        assert_eq!(Meter::from_bits(meter.to_bits()), meter);
        assert_eq!(Meter::new(0, 12), Meter::new(1, Meter::MAX_DIVISOR));
    }
}
