//! Trama Core - real-time audio/MIDI render graph
//!
//! This crate turns a user-edited network of processing nodes into a
//! deterministic signal path rendered on an audio callback thread, while the
//! network is edited concurrently from a control thread.
//!
//! # Core Abstractions
//!
//! ## Ports
//!
//! - [`PortType`] - Control, Audio, CV, MIDI (and Unknown)
//! - [`PortCount`] - Per-type input/output tallies, flattened by [`PortCount::to_port_list`]
//!
//! ## Cross-thread primitives
//!
//! - [`AtomicValue`] - Double-buffered value with a four-state write handshake
//! - [`SpinLock`] / [`AtomicLock`] - Bounded busy-spin mutual exclusion
//!
//! ## Graph
//!
//! - [`GraphProcessor`] - Control-thread owner of nodes and connections
//! - [`Renderer`] - Render-thread block loop
//! - [`Processor`] - Capability every node body implements
//! - [`NodeFactory`] / [`NodeProvider`] - Creation by type id
//!
//! ## Transport
//!
//! - [`Transport`] / [`TransportHandle`] / [`Monitor`] - Sample-accurate play, record,
//!   tempo, meter and position, split between the two threads
//!
//! ## Assembly
//!
//! - [`Engine`] / [`EngineRenderer`] - A graph plus a transport, wired together
//!
//! # Design Principles
//!
//! - **Real-time safe**: the render path never allocates, frees, or blocks
//! - **Whole generations**: the renderer sees a complete topology or the previous one
//! - **Explicit wiring**: collaborators are injected, there is no global context
//!
//! # Logging
//!
//! Enable the `tracing` feature to log control-thread graph changes at debug
//! level. The render path never logs.

pub mod atomic;
pub mod engine;
pub mod graph;
pub mod math;
pub mod oversample;
pub mod port;
pub mod transport;

pub use atomic::{
    AtomicBits, AtomicLock, AtomicValue, Contention, DEFAULT_RETRY_LIMIT, SPIN_ATTEMPTS, SpinLock,
};
pub use engine::{Engine, EngineRenderer, EngineSettings};
pub use graph::{
    ArcTable, AudioBuffer, Connection, GraphError, GraphEvent, GraphNode, GraphProcessor,
    GraphSettings, HostIo, MidiBuffer, MidiEvent, NodeDescriptor, NodeFactory, NodeId, NodeKind,
    NodeProvider, PrepareError, ProcessBlock, ProcessingState, Processor, RenderStats, Renderer,
    Topology,
};
pub use math::{apply_gain, apply_gain_ramp, db_to_linear, linear_to_db, rms};
pub use oversample::{OversampleFactor, Oversampler};
pub use port::{PortCount, PortDescription, PortList, PortType};
pub use transport::{
    BarBeatTick, Meter, Monitor, PPQ, PlayState, TimeInfo, Transport, TransportHandle,
    TransportSettings,
};
