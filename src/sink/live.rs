//! Live transmission sink.
//!
//! Adds the channel number into the status byte and forwards raw bytes to
//! a [`MidiPort`]. Loop markers have no live representation and fail with
//! [`SinkError::Unsupported`], and so do meta events, which only exist in
//! files.

use super::{sysex_window, Sink};
use crate::error::{SinkError, SinkResult};
use midly::live::LiveEvent;
use std::fmt;

/// A raw MIDI output.
pub trait MidiPort {
    /// Sends one complete MIDI message.
    fn send(&mut self, bytes: &[u8]) -> SinkResult;
}

/// Capturing port: every message is stored as its own byte vector.
impl MidiPort for Vec<Vec<u8>> {
    fn send(&mut self, bytes: &[u8]) -> SinkResult {
        self.push(bytes.to_vec());
        Ok(())
    }
}

/// Sink that transmits primitives to a port as they arrive.
pub struct LiveSink<P: MidiPort> {
    port: P,
}

impl<P: MidiPort> LiveSink<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Borrows the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Consumes the sink, returning the port.
    pub fn into_port(self) -> P {
        self.port
    }

    fn transmit(&mut self, bytes: &[u8]) -> SinkResult {
        match LiveEvent::parse(bytes) {
            Ok(event) => tracing::trace!(?event, "transmit"),
            Err(_) => tracing::trace!(?bytes, "transmit (unparsed)"),
        }
        self.port.send(bytes)
    }
}

impl<P: MidiPort> Sink for LiveSink<P> {
    fn begin_loop(&mut self, _channel: u8) -> SinkResult {
        Err(SinkError::Unsupported {
            operation: "begin_loop",
        })
    }

    fn break_loop(&mut self, _channel: u8, _targets: &[i32]) -> SinkResult {
        Err(SinkError::Unsupported {
            operation: "break_loop",
        })
    }

    fn end_loop(&mut self, _channel: u8, _repeats: i32) -> SinkResult {
        Err(SinkError::Unsupported {
            operation: "end_loop",
        })
    }

    fn midi_event2(&mut self, channel: u8, status: u8, data: u8) -> SinkResult {
        self.transmit(&[status.wrapping_add(channel), data])
    }

    fn midi_event3(&mut self, channel: u8, status: u8, data1: u8, data2: u8) -> SinkResult {
        self.transmit(&[status.wrapping_add(channel), data1, data2])
    }

    fn midi_meta(&mut self, _meta_type: u8, _bytes: &[u8]) -> SinkResult {
        Err(SinkError::Unsupported {
            operation: "midi_meta",
        })
    }

    fn midi_meta_text(&mut self, _meta_type: u8, _text: &str) -> SinkResult {
        Err(SinkError::Unsupported {
            operation: "midi_meta_text",
        })
    }

    fn midi_sysex(&mut self, bytes: &[u8], offset: usize, length: usize) -> SinkResult {
        let window = sysex_window(bytes, offset, length);
        self.transmit(window)
    }

    fn debug(&mut self, value: &dyn fmt::Display) {
        tracing::info!("{}", value);
    }
}

#[cfg(feature = "midir")]
pub use self::midir_port::MidirPort;

#[cfg(feature = "midir")]
mod midir_port {
    use super::MidiPort;
    use crate::error::{SinkError, SinkResult};
    use anyhow::Context;
    use midir::{MidiOutput, MidiOutputConnection};

    /// Hardware or virtual output port opened through `midir`.
    pub struct MidirPort {
        name: String,
        connection: MidiOutputConnection,
    }

    impl MidirPort {
        /// Lists the names of the available output ports.
        pub fn enumerate() -> anyhow::Result<Vec<String>> {
            let output = MidiOutput::new("mmlengine").context("initialise midir for enumeration")?;
            let mut names = Vec::new();
            for (index, port) in output.ports().into_iter().enumerate() {
                let name = output
                    .port_name(&port)
                    .unwrap_or_else(|_| format!("Port {index}"));
                names.push(name);
            }
            Ok(names)
        }

        /// Opens the output port at `port_index`.
        pub fn open(port_index: usize) -> anyhow::Result<Self> {
            let output = MidiOutput::new("mmlengine").context("initialise midir for output")?;
            let ports = output.ports();
            let Some(port) = ports.get(port_index) else {
                anyhow::bail!("midi port index out of range");
            };
            let name = output
                .port_name(port)
                .unwrap_or_else(|_| format!("Port {port_index}"));
            let connection = output
                .connect(port, "mmlengine-output")
                .map_err(|err| anyhow::anyhow!("failed to open MIDI output: {err}"))?;
            Ok(Self { name, connection })
        }

        /// Name of the connected port.
        pub fn name(&self) -> &str {
            &self.name
        }
    }

    impl MidiPort for MidirPort {
        fn send(&mut self, bytes: &[u8]) -> SinkResult {
            self.connection
                .send(bytes)
                .map_err(|err| SinkError::Port(err.to_string()))
        }
    }
}
