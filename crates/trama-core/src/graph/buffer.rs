//! Preallocated sample and event buffers.
//!
//! Buffers are sized on the control thread when a render plan is built. The
//! render thread only reads, writes, and clears them; nothing here grows a
//! buffer once it exists.

/// Planar multi-channel sample buffer with a fixed frame capacity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: usize,
    capacity: usize,
}

impl AudioBuffer {
    /// Creates a zeroed buffer of `channels` × `capacity` frames.
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; channels * capacity],
            channels,
            capacity,
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames per channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Full-capacity view of one channel.
    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.capacity;
        &self.data[start..start + self.capacity]
    }

    /// Mutable full-capacity view of one channel.
    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.capacity;
        &mut self.data[start..start + self.capacity]
    }

    /// Zeroes the first `frames` frames of every channel.
    pub fn clear_frames(&mut self, frames: usize) {
        let frames = frames.min(self.capacity);
        for ch in 0..self.channels {
            self.channel_mut(ch)[..frames].fill(0.0);
        }
    }

    /// Zeroes the whole buffer.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Adds `source` into channel `ch`, sample by sample.
    #[inline]
    pub fn add_to_channel(&mut self, ch: usize, source: &[f32]) {
        let dest = self.channel_mut(ch);
        for (d, s) in dest.iter_mut().zip(source) {
            *d += *s;
        }
    }

    /// Copies `source` into channel `ch`.
    #[inline]
    pub fn copy_to_channel(&mut self, ch: usize, source: &[f32]) {
        let len = source.len().min(self.capacity);
        self.channel_mut(ch)[..len].copy_from_slice(&source[..len]);
    }

    /// Fills channel `ch` from interleaved data holding `channels` channels.
    ///
    /// Missing source channels leave the destination channel silent.
    pub fn read_interleaved(&mut self, interleaved: &[f32], channels: usize, frames: usize) {
        let frames = frames.min(self.capacity);
        for ch in 0..self.channels {
            let dest = &mut self.data[ch * self.capacity..ch * self.capacity + frames];
            if ch < channels {
                for (f, d) in dest.iter_mut().enumerate() {
                    *d = interleaved.get(f * channels + ch).copied().unwrap_or(0.0);
                }
            } else {
                dest.fill(0.0);
            }
        }
    }

    /// Writes the first `frames` frames as interleaved samples.
    pub fn write_interleaved(&self, interleaved: &mut [f32], frames: usize) {
        let frames = frames.min(self.capacity);
        for ch in 0..self.channels {
            for (f, &s) in self.channel(ch)[..frames].iter().enumerate() {
                if let Some(d) = interleaved.get_mut(f * self.channels + ch) {
                    *d = s;
                }
            }
        }
    }
}

/// One short MIDI message with a frame offset inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Frame offset from the start of the block.
    pub frame: u32,
    bytes: [u8; 3],
    len: u8,
}

impl MidiEvent {
    /// Builds an event from 1-3 raw bytes.
    pub fn new(frame: u32, data: &[u8]) -> Option<Self> {
        if data.is_empty() || data.len() > 3 {
            return None;
        }
        let mut bytes = [0; 3];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            frame,
            bytes,
            len: data.len() as u8,
        })
    }

    /// Note-on on a zero-based channel.
    pub fn note_on(frame: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            frame,
            bytes: [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            len: 3,
        }
    }

    /// Note-off on a zero-based channel.
    pub fn note_off(frame: u32, channel: u8, note: u8) -> Self {
        Self {
            frame,
            bytes: [0x80 | (channel & 0x0F), note & 0x7F, 0],
            len: 3,
        }
    }

    /// System real-time Start.
    pub fn start(frame: u32) -> Self {
        Self::realtime(frame, 0xFA)
    }

    /// System real-time Continue.
    pub fn continue_playback(frame: u32) -> Self {
        Self::realtime(frame, 0xFB)
    }

    /// System real-time Stop.
    pub fn stop(frame: u32) -> Self {
        Self::realtime(frame, 0xFC)
    }

    fn realtime(frame: u32, status: u8) -> Self {
        Self {
            frame,
            bytes: [status, 0, 0],
            len: 1,
        }
    }

    /// Raw message bytes.
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Status byte.
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    /// Zero-based channel for channel-voice messages.
    pub fn channel(&self) -> Option<u8> {
        (0x80..0xF0)
            .contains(&self.bytes[0])
            .then_some(self.bytes[0] & 0x0F)
    }
}

/// Bounded list of MIDI events ordered by frame.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
}

// Derived Clone would shrink the capacity to the length.
impl Clone for MidiBuffer {
    fn clone(&self) -> Self {
        let mut events = Vec::with_capacity(self.events.capacity());
        events.extend_from_slice(&self.events);
        Self { events }
    }
}

impl MidiBuffer {
    /// Creates an empty buffer that holds up to `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of events.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    /// Number of events.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes all events.
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events in frame order.
    pub fn iter(&self) -> core::slice::Iter<'_, MidiEvent> {
        self.events.iter()
    }

    /// Inserts `event` after any events at the same or earlier frame.
    ///
    /// Returns `false` and drops the event when the buffer is full.
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.events.len() == self.events.capacity() {
            return false;
        }
        let at = self
            .events
            .iter()
            .rposition(|e| e.frame <= event.frame)
            .map_or(0, |i| i + 1);
        self.events.insert(at, event);
        true
    }

    /// Merges every event of `other` into this buffer. Returns how many were dropped.
    pub fn merge_from(&mut self, other: &MidiBuffer) -> usize {
        other.iter().filter(|e| !self.push(**e)).count()
    }

    /// Copies `other` into this buffer, replacing its contents.
    pub fn copy_from(&mut self, other: &MidiBuffer) -> usize {
        self.clear();
        self.merge_from(other)
    }

    /// Multiplies every frame offset by `factor`.
    pub fn scale_frames(&mut self, factor: u32) {
        for e in &mut self.events {
            e.frame = e.frame.saturating_mul(factor);
        }
    }

    /// Divides every frame offset by `factor`.
    pub fn divide_frames(&mut self, factor: u32) {
        let factor = factor.max(1);
        for e in &mut self.events {
            e.frame /= factor;
        }
    }
}

impl<'a> IntoIterator for &'a MidiBuffer {
    type Item = &'a MidiEvent;
    type IntoIter = core::slice::Iter<'a, MidiEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
