//! Render graph: nodes, connections, scheduling and the per-block render loop.
//!
//! # Architecture
//!
//! The graph is split in two objects that never share mutable state:
//!
//! - [`GraphProcessor`] lives on the control thread. It owns the node arena
//!   (keyed by [`NodeId`]) and the connection set, validates every mutation,
//!   and publishes an immutable [`Topology`] per change: sorted connections,
//!   the [`ArcTable`] used for cycle rejection, and the render order.
//! - [`Renderer`] lives on the render thread. It receives compiled render
//!   plans (routing plus preallocated buffers) over a wait-free SPSC ring and
//!   returns replaced plans on a second ring, so it never allocates or frees.
//!
//! Arc table and render order are rebuilt together into one generation, and
//! the renderer only ever sees a complete generation.
//!
//! # Scheduling
//!
//! Render order is a topological sort (Kahn's algorithm) with ties broken by
//! ascending node id, so the same topology always yields the same order.
//!
//! # Node removal
//!
//! A removed node is suspended first. A renderer still holding the previous
//! plan renders it as silence until it adopts the next one.
//!
//! # Example
//!
//! ```rust
//! use trama_core::graph::{AudioBuffer, GraphProcessor, GraphSettings, HostIo, MidiBuffer, NodeKind};
//! use trama_core::TimeInfo;
//!
//! let (mut graph, mut renderer) = GraphProcessor::new(GraphSettings::default());
//! let input = graph.add_io_node(NodeKind::AudioInput).unwrap();
//! let output = graph.add_io_node(NodeKind::AudioOutput).unwrap();
//! graph.add_connection(input, 0, output, 0).unwrap();
//! graph.prepare_to_play(48_000.0, 64);
//!
//! let mut audio_in = AudioBuffer::new(2, 64);
//! audio_in.channel_mut(0).fill(0.5);
//! let mut audio_out = AudioBuffer::new(2, 64);
//! let midi_in = MidiBuffer::with_capacity(16);
//! let mut midi_out = MidiBuffer::with_capacity(16);
//! let mut io = HostIo {
//!     audio_in: &audio_in,
//!     audio_out: &mut audio_out,
//!     midi_in: &midi_in,
//!     midi_out: &mut midi_out,
//! };
//! renderer.render(64, &mut io, &TimeInfo::default());
//! assert_eq!(audio_out.channel(0)[10], 0.5);
//! assert_eq!(audio_out.channel(1)[10], 0.0);
//! ```

pub mod buffer;
pub mod connection;
pub mod events;
pub mod factory;
pub mod node;
pub mod plan;
mod processing;
pub mod processor;
mod render;
mod subgraph;

pub use buffer::{AudioBuffer, MidiBuffer, MidiEvent};
pub use connection::{ArcTable, Connection};
pub use events::{GraphEvent, SubscriptionId};
pub use factory::{NodeDescriptor, NodeFactory, NodeProvider};
pub use node::{GainRamp, GraphId, GraphNode, NodeId, NodeKind, PropertyValue};
pub use plan::Topology;
pub use processing::{GraphError, GraphProcessor, GraphSettings, ProcessingState};
pub use processor::{PrepareError, ProcessBlock, Processor};
pub use render::{HostIo, RenderStats, Renderer};
