//! mmlengine - Music Macro Language runtime engine.
//!
//! Turns high-level musical operations (notes, control sweeps, loops, meta
//! events) into primitive MIDI-equivalent calls on a [`Sink`], while keeping
//! a tick-accurate virtual timeline per track.

pub mod config;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod macros;
pub mod pitch;
pub mod sink;
pub mod timeline;

// Re-export commonly used types
pub use config::{ChannelDefaults, EngineConfig};
pub use controller::{ChannelState, NoteOptions, SpectralKind, TrackController};
pub use envelope::{OneShot, Triangle};
pub use error::{MacroError, SinkError, SinkResult};
pub use macros::{MacroArg, MacroTable};
pub use pitch::{Accidental, PitchClass};
pub use sink::{LiveSink, MidiPort, Sink, TextSink};
pub use timeline::{Length, Resolution, Ticks, DEFAULT_BASE_COUNT};
