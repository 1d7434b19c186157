//! Trama Nodes - built-in processors for the render graph
//!
//! Every type here implements [`trama_core::Processor`] and is reachable by
//! type id through [`BuiltinProvider`]:
//!
//! | Type id               | Node                   | Ports                  |
//! |-----------------------|------------------------|------------------------|
//! | `volume`              | [`Volume`] (stereo)    | 2 audio in, 2 out      |
//! | `volume-mono`         | [`Volume`] (mono)      | 1 audio in, 1 out      |
//! | `mixer`               | [`AudioMixer`]         | 8 audio in, 2 out      |
//! | `wetdry`              | [`WetDry`]             | 4 audio in, 2 out      |
//! | `oscillator`          | [`Oscillator`]         | 2 audio out            |
//! | `midi-channel-filter` | [`MidiChannelFilter`]  | 1 MIDI in, 1 out       |
//!
//! Level changes are ramped across one block.
//!
//! ## Example
//!
//! ```rust
//! use trama_core::{GraphProcessor, GraphSettings, NodeFactory, NodeKind};
//! use trama_nodes::BuiltinProvider;
//! use std::sync::Arc;
//!
//! let mut factory = NodeFactory::new();
//! factory.register(BuiltinProvider::new());
//! let (mut graph, _renderer) =
//!     GraphProcessor::with_factory(GraphSettings::default(), Arc::new(factory));
//!
//! let osc = graph.add_node_of_type("oscillator").unwrap();
//! let out = graph.add_io_node(NodeKind::AudioOutput).unwrap();
//! graph.add_connection(osc, 0, out, 0).unwrap();
//! graph.add_connection(osc, 1, out, 1).unwrap();
//! ```

pub mod midi_filter;
pub mod mixer;
pub mod oscillator;
pub mod param;
pub mod registry;
pub mod volume;
pub mod wetdry;

#[cfg(test)]
mod testing;

pub use midi_filter::MidiChannelFilter;
pub use mixer::AudioMixer;
pub use oscillator::Oscillator;
pub use param::{ParamDescriptor, ParamUnit};
pub use registry::BuiltinProvider;
pub use volume::Volume;
pub use wetdry::WetDry;
