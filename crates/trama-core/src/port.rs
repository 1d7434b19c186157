//! Port taxonomy and per-node port layout.
//!
//! Every node declares its ports as a [`PortCount`]: a tally of inputs and
//! outputs per [`PortType`]. The tally expands into a [`PortList`] whose
//! global indices follow one fixed order: for each type in ascending type id,
//! all inputs, then all outputs.
//!
//! # Example
//!
//! ```rust
//! use trama_core::{PortCount, PortType};
//!
//! let count = PortCount::new().with(PortType::Audio, 2, 2);
//! let ports = count.to_port_list();
//!
//! let symbols: Vec<&str> = ports.iter().map(|p| p.symbol.as_str()).collect();
//! assert_eq!(symbols, ["audio_in_1", "audio_in_2", "audio_out_1", "audio_out_2"]);
//! assert_eq!(ports.get(2).map(|p| p.name.as_str()), Some("Audio Out 1"));
//! ```

use core::fmt;

/// Kind of signal a port carries.
///
/// The discriminant is the type id used for port ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PortType {
    /// One control value per block.
    Control = 0,
    /// Audio-rate sample buffer.
    Audio = 1,
    /// Audio-rate control voltage buffer.
    Cv = 2,
    /// Timestamped MIDI events.
    Midi = 3,
    /// Unrecognised port; never connects to anything.
    Unknown = 4,
}

impl PortType {
    /// Number of concrete (countable) port types.
    pub const COUNT: usize = 4;

    /// Concrete port types in ascending type-id order.
    pub const ALL: [PortType; Self::COUNT] =
        [PortType::Control, PortType::Audio, PortType::Cv, PortType::Midi];

    /// Numeric type id.
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Maps a type id back to a port type. Out-of-range ids map to `Unknown`.
    pub const fn from_id(id: u8) -> Self {
        match id {
            0 => PortType::Control,
            1 => PortType::Audio,
            2 => PortType::Cv,
            3 => PortType::Midi,
            _ => PortType::Unknown,
        }
    }

    /// Lowercase slug used in port symbols.
    pub const fn slug(self) -> &'static str {
        match self {
            PortType::Control => "control",
            PortType::Audio => "audio",
            PortType::Cv => "cv",
            PortType::Midi => "midi",
            PortType::Unknown => "unknown",
        }
    }

    /// Display name used in port names.
    pub const fn name(self) -> &'static str {
        match self {
            PortType::Control => "Control",
            PortType::Audio => "Audio",
            PortType::Cv => "CV",
            PortType::Midi => "MIDI",
            PortType::Unknown => "Unknown",
        }
    }

    /// Parses a slug produced by [`slug`](Self::slug).
    pub fn from_slug(slug: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.slug() == slug)
            .unwrap_or(PortType::Unknown)
    }

    /// Whether a port of this type may feed a port of type `dest`.
    ///
    /// Equal types connect. Audio and Control may also drive CV.
    /// `Unknown` never connects.
    pub const fn can_connect(self, dest: PortType) -> bool {
        match (self, dest) {
            (PortType::Unknown, _) | (_, PortType::Unknown) => false,
            (PortType::Audio | PortType::Control, PortType::Cv) => true,
            (a, b) => a as u8 == b as u8,
        }
    }

    /// True for audio-rate sample buffers (Audio and CV).
    #[inline]
    pub const fn is_signal(self) -> bool {
        matches!(self, PortType::Audio | PortType::Cv)
    }

    #[inline]
    const fn slot(self) -> Option<usize> {
        match self {
            PortType::Unknown => None,
            t => Some(t as usize),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One port of a node, as produced by [`PortCount::to_port_list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortDescription {
    /// Signal kind.
    pub port_type: PortType,
    /// Global index within the node.
    pub index: u32,
    /// Zero-based index within (type, direction).
    pub channel: u32,
    /// Flow direction.
    pub is_input: bool,
    /// Stable symbol, e.g. `audio_in_1`.
    pub symbol: String,
    /// Display name, e.g. `Audio In 1`.
    pub name: String,
}

/// Inputs and outputs per port type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PortCount {
    inputs: [u32; PortType::COUNT],
    outputs: [u32; PortType::COUNT],
}

impl PortCount {
    /// An empty tally.
    pub const fn new() -> Self {
        Self {
            inputs: [0; PortType::COUNT],
            outputs: [0; PortType::COUNT],
        }
    }

    /// Builder form of two [`set`](Self::set) calls.
    pub fn with(mut self, port_type: PortType, inputs: u32, outputs: u32) -> Self {
        self.set(port_type, inputs, true);
        self.set(port_type, outputs, false);
        self
    }

    /// Number of ports of `port_type` in the given direction.
    pub fn get(&self, port_type: PortType, is_input: bool) -> u32 {
        match port_type.slot() {
            Some(i) if is_input => self.inputs[i],
            Some(i) => self.outputs[i],
            None => 0,
        }
    }

    /// Sets the number of ports of `port_type` in the given direction.
    ///
    /// `Unknown` ports are not countable; setting them has no effect.
    pub fn set(&mut self, port_type: PortType, count: u32, is_input: bool) {
        match port_type.slot() {
            Some(i) if is_input => self.inputs[i] = count,
            Some(i) => self.outputs[i] = count,
            None => {}
        }
    }

    /// Total number of ports across all types and directions.
    pub fn total(&self) -> u32 {
        self.inputs.iter().chain(self.outputs.iter()).sum()
    }

    /// Expands the tally into an ordered port list.
    ///
    /// Deterministic: an unchanged tally always yields an identical list.
    pub fn to_port_list(&self) -> PortList {
        let mut ports = Vec::with_capacity(self.total() as usize);
        for port_type in PortType::ALL {
            for is_input in [true, false] {
                let (dir_slug, dir_name) = if is_input { ("in", "In") } else { ("out", "Out") };
                for channel in 0..self.get(port_type, is_input) {
                    let n = channel + 1;
                    ports.push(PortDescription {
                        port_type,
                        index: ports.len() as u32,
                        channel,
                        is_input,
                        symbol: format!("{}_{dir_slug}_{n}", port_type.slug()),
                        name: format!("{} {dir_name} {n}", port_type.name()),
                    });
                }
            }
        }
        PortList { ports }
    }
}

/// Flattened, ordered ports of one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortList {
    ports: Vec<PortDescription>,
}

impl PortList {
    /// Number of ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// True if the node has no ports.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Iterates ports in index order.
    pub fn iter(&self) -> core::slice::Iter<'_, PortDescription> {
        self.ports.iter()
    }

    /// Port at a global index.
    pub fn get(&self, index: u32) -> Option<&PortDescription> {
        self.ports.get(index as usize)
    }

    /// Type of the port at `index`, `Unknown` when out of range.
    pub fn port_type(&self, index: u32) -> PortType {
        self.get(index).map_or(PortType::Unknown, |p| p.port_type)
    }

    /// Channel of the port at `index` within its (type, direction).
    pub fn channel_of(&self, index: u32) -> Option<u32> {
        self.get(index).map(|p| p.channel)
    }

    /// Whether the port at `index` is an input.
    pub fn is_input(&self, index: u32) -> Option<bool> {
        self.get(index).map(|p| p.is_input)
    }

    /// Global index of a (type, channel, direction) triple.
    pub fn index_of(&self, port_type: PortType, channel: u32, is_input: bool) -> Option<u32> {
        self.ports
            .iter()
            .find(|p| p.port_type == port_type && p.channel == channel && p.is_input == is_input)
            .map(|p| p.index)
    }

    /// Looks a port up by its symbol.
    pub fn find_by_symbol(&self, symbol: &str) -> Option<&PortDescription> {
        self.ports.iter().find(|p| p.symbol == symbol)
    }

    /// Number of ports of `port_type` in the given direction.
    pub fn count(&self, port_type: PortType, is_input: bool) -> u32 {
        self.ports
            .iter()
            .filter(|p| p.port_type == port_type && p.is_input == is_input)
            .count() as u32
    }

    /// Rebuilds the tally this list was expanded from.
    pub fn port_count(&self) -> PortCount {
        let mut count = PortCount::new();
        for port_type in PortType::ALL {
            count.set(port_type, self.count(port_type, true), true);
            count.set(port_type, self.count(port_type, false), false);
        }
        count
    }
}

impl<'a> IntoIterator for &'a PortList {
    type Item = &'a PortDescription;
    type IntoIter = core::slice::Iter<'a, PortDescription>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.iter()
    }
}
