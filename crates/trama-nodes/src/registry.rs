//! Built-in node provider
//!
//! Exposes every node in this crate to a [`NodeFactory`] under the
//! `"builtin"` format.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trama_core::NodeFactory;
//! use trama_nodes::BuiltinProvider;
//!
//! let mut factory = NodeFactory::new();
//! factory.register(BuiltinProvider::new());
//! let factory = Arc::new(factory);
//!
//! let volume = factory.instantiate("volume").unwrap();
//! assert_eq!(volume.name(), "Volume");
//! assert!(factory.instantiate("reverb").is_none());
//! ```
//!
//! [`NodeFactory`]: trama_core::NodeFactory

use trama_core::{NodeDescriptor, NodeProvider, Processor};

use crate::{AudioMixer, MidiChannelFilter, Oscillator, Volume, WetDry};

/// Format name reported by [`BuiltinProvider`].
pub const FORMAT: &str = "builtin";

/// Static description of one built-in node.
struct Entry {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    create: fn() -> Box<dyn Processor>,
}

const ENTRIES: &[Entry] = &[
    Entry {
        id: "volume",
        name: "Volume",
        category: "Utility",
        create: || Box::new(Volume::stereo()),
    },
    Entry {
        id: "volume-mono",
        name: "Volume (Mono)",
        category: "Utility",
        create: || Box::new(Volume::mono()),
    },
    Entry {
        id: "mixer",
        name: "Audio Mixer",
        category: "Mixing",
        create: || Box::new(AudioMixer::default()),
    },
    Entry {
        id: "wetdry",
        name: "Wet/Dry",
        category: "Mixing",
        create: || Box::new(WetDry::new()),
    },
    Entry {
        id: "oscillator",
        name: "Oscillator",
        category: "Generator",
        create: || Box::new(Oscillator::new()),
    },
    Entry {
        id: "midi-channel-filter",
        name: "MIDI Channel Filter",
        category: "MIDI",
        create: || Box::new(MidiChannelFilter::new()),
    },
];

/// Provider for the nodes in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProvider;

impl BuiltinProvider {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }

    /// Type ids in registration order.
    pub fn type_ids() -> impl Iterator<Item = &'static str> {
        ENTRIES.iter().map(|e| e.id)
    }

    /// Every built-in node, in registration order.
    pub fn descriptors() -> Vec<NodeDescriptor> {
        ENTRIES
            .iter()
            .map(|e| NodeDescriptor::new(e.id, e.name, e.category, FORMAT))
            .collect()
    }
}

impl NodeProvider for BuiltinProvider {
    fn format(&self) -> &str {
        FORMAT
    }

    fn types(&self) -> Vec<NodeDescriptor> {
        Self::descriptors()
    }

    fn create(&self, type_id: &str) -> Option<Box<dyn Processor>> {
        ENTRIES
            .iter()
            .find(|e| e.id == type_id)
            .map(|e| (e.create)())
    }
}
