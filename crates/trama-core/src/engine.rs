//! Top-level assembly of a graph and a transport.
//!
//! [`Engine`] is the control-thread half: graph editing plus transport
//! requests. [`EngineRenderer`] is the render-thread half, called once per
//! host block. Collaborators are passed in at construction; there is no
//! global context.
//!
//! # Example
//!
//! ```rust
//! use trama_core::{AudioBuffer, Engine, EngineSettings, HostIo, MidiBuffer};
//!
//! let (mut engine, mut renderer) = Engine::new(EngineSettings::default(), None);
//! engine.prepare_to_play(48_000.0, 128).unwrap();
//! engine.transport().request_play_state(true).unwrap();
//!
//! let audio_in = AudioBuffer::new(2, 128);
//! let mut audio_out = AudioBuffer::new(2, 128);
//! let midi_in = MidiBuffer::with_capacity(8);
//! let mut midi_out = MidiBuffer::with_capacity(8);
//! let mut io = HostIo {
//!     audio_in: &audio_in,
//!     audio_out: &mut audio_out,
//!     midi_in: &midi_in,
//!     midi_out: &mut midi_out,
//! };
//! renderer.process(128, &mut io);
//! assert_eq!(engine.transport().monitor().position_frames(), 128);
//! ```

use std::sync::Arc;

use crate::atomic::Contention;
use crate::graph::{
    GraphProcessor, GraphSettings, HostIo, MidiBuffer, MidiEvent, NodeFactory, Renderer,
};
use crate::transport::{Transport, TransportHandle, TransportSettings};

/// Everything needed to build an [`Engine`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineSettings {
    /// Graph configuration.
    pub graph: GraphSettings,
    /// Initial transport state.
    pub transport: TransportSettings,
    /// Inject MIDI Start/Continue/Stop into the MIDI input on play-state changes.
    pub send_midi_transport: bool,
}

/// Control-thread side of the engine.
#[derive(Debug)]
pub struct Engine {
    graph: GraphProcessor,
    transport: TransportHandle,
}

impl Engine {
    /// Builds the engine and its render-thread counterpart.
    pub fn new(settings: EngineSettings, factory: Option<Arc<NodeFactory>>) -> (Self, EngineRenderer) {
        let (graph, renderer) = match factory {
            Some(factory) => GraphProcessor::with_factory(settings.graph, factory),
            None => GraphProcessor::new(settings.graph),
        };
        let transport = Transport::new(&settings.transport);
        let handle = transport.handle();
        let engine_renderer = EngineRenderer {
            renderer,
            transport,
            send_midi_transport: settings.send_midi_transport,
            was_playing: false,
            midi_scratch: MidiBuffer::with_capacity(settings.graph.midi_event_capacity),
        };
        (
            Self {
                graph,
                transport: handle,
            },
            engine_renderer,
        )
    }

    /// The graph.
    pub fn graph(&self) -> &GraphProcessor {
        &self.graph
    }

    /// The graph, for editing.
    pub fn graph_mut(&mut self) -> &mut GraphProcessor {
        &mut self.graph
    }

    /// Transport requests and monitor.
    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    /// Prepares the graph and moves the transport to the new rate.
    pub fn prepare_to_play(&mut self, sample_rate: f64, block_size: usize) -> Result<(), Contention> {
        self.graph.prepare_to_play(sample_rate, block_size);
        self.transport.request_sample_rate(sample_rate)
    }

    /// Releases graph resources.
    pub fn release_resources(&mut self) {
        self.graph.release_resources();
    }
}

/// Render-thread side of the engine.
pub struct EngineRenderer {
    renderer: Renderer,
    transport: Transport,
    send_midi_transport: bool,
    was_playing: bool,
    midi_scratch: MidiBuffer,
}

impl core::fmt::Debug for EngineRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineRenderer")
            .field("renderer", &self.renderer)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl EngineRenderer {
    /// Renders one host block: latch transport, render the graph, apply transport requests.
    pub fn process(&mut self, frames: usize, io: &mut HostIo<'_>) {
        self.transport.pre_process(frames);
        let time = self.transport.time_info();

        if self.send_midi_transport && time.playing != self.was_playing {
            let event = if !time.playing {
                MidiEvent::stop(0)
            } else if time.frame <= 0 {
                MidiEvent::start(0)
            } else {
                MidiEvent::continue_playback(0)
            };
            self.midi_scratch.copy_from(io.midi_in);
            self.midi_scratch.push(event);
            let mut with_transport = HostIo {
                audio_in: io.audio_in,
                audio_out: &mut *io.audio_out,
                midi_in: &self.midi_scratch,
                midi_out: &mut *io.midi_out,
            };
            self.renderer.render(frames, &mut with_transport, &time);
        } else {
            self.renderer.render(frames, io, &time);
        }

        self.was_playing = time.playing;
        self.transport.post_process(frames);
    }

    /// Render-side transport state.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The graph renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
}
