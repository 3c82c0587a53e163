//! The primitive sink contract and its two implementations.
//!
//! A sink receives the primitive calls the controller makes: loop markers,
//! 2- and 3-byte channel messages, meta events, SysEx and debug values.
//! The controller never folds the channel into the status byte; each sink
//! owns that encoding. A sink that cannot represent a primitive returns
//! [`SinkError::Unsupported`](crate::SinkError::Unsupported) immediately.
//!
//! - [`TextSink`] serializes primitives into a textual intermediate form
//! - [`LiveSink`] transmits raw bytes to a MIDI output port

pub mod live;
pub mod text;

pub use live::{LiveSink, MidiPort};
pub use text::TextSink;

use crate::error::SinkResult;
use std::fmt;

/// Consumer of primitive events.
pub trait Sink {
    /// Opens a loop on `channel`.
    fn begin_loop(&mut self, channel: u8) -> SinkResult;

    /// Marks a loop break that applies to the given repeat targets.
    fn break_loop(&mut self, channel: u8, targets: &[i32]) -> SinkResult;

    /// Closes the innermost loop, repeating it `repeats` times.
    fn end_loop(&mut self, channel: u8, repeats: i32) -> SinkResult;

    /// Two-byte channel message (program change, channel aftertouch).
    fn midi_event2(&mut self, channel: u8, status: u8, data: u8) -> SinkResult;

    /// Three-byte channel message.
    fn midi_event3(&mut self, channel: u8, status: u8, data1: u8, data2: u8) -> SinkResult;

    /// Meta event with a binary payload.
    fn midi_meta(&mut self, meta_type: u8, bytes: &[u8]) -> SinkResult;

    /// Meta event with a text payload.
    fn midi_meta_text(&mut self, meta_type: u8, text: &str) -> SinkResult;

    /// System exclusive message taken from `bytes[offset..offset + length]`.
    fn midi_sysex(&mut self, bytes: &[u8], offset: usize, length: usize) -> SinkResult;

    /// Best-effort diagnostic output. Failures are swallowed by the sink.
    fn debug(&mut self, value: &dyn fmt::Display);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn begin_loop(&mut self, channel: u8) -> SinkResult {
        (**self).begin_loop(channel)
    }

    fn break_loop(&mut self, channel: u8, targets: &[i32]) -> SinkResult {
        (**self).break_loop(channel, targets)
    }

    fn end_loop(&mut self, channel: u8, repeats: i32) -> SinkResult {
        (**self).end_loop(channel, repeats)
    }

    fn midi_event2(&mut self, channel: u8, status: u8, data: u8) -> SinkResult {
        (**self).midi_event2(channel, status, data)
    }

    fn midi_event3(&mut self, channel: u8, status: u8, data1: u8, data2: u8) -> SinkResult {
        (**self).midi_event3(channel, status, data1, data2)
    }

    fn midi_meta(&mut self, meta_type: u8, bytes: &[u8]) -> SinkResult {
        (**self).midi_meta(meta_type, bytes)
    }

    fn midi_meta_text(&mut self, meta_type: u8, text: &str) -> SinkResult {
        (**self).midi_meta_text(meta_type, text)
    }

    fn midi_sysex(&mut self, bytes: &[u8], offset: usize, length: usize) -> SinkResult {
        (**self).midi_sysex(bytes, offset, length)
    }

    fn debug(&mut self, value: &dyn fmt::Display) {
        (**self).debug(value)
    }
}

/// Returns the SysEx window `bytes[offset..offset + length]`, clamped to
/// the slice bounds.
pub(crate) fn sysex_window(bytes: &[u8], offset: usize, length: usize) -> &[u8] {
    let start = offset.min(bytes.len());
    let end = start.saturating_add(length).min(bytes.len());
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysex_window_clamps() {
        let bytes = [0xF0, 0x7E, 0x7F, 0xF7];
        assert_eq!(sysex_window(&bytes, 1, 2), &[0x7E, 0x7F]);
        assert_eq!(sysex_window(&bytes, 2, 10), &[0x7F, 0xF7]);
        assert!(sysex_window(&bytes, 9, 1).is_empty());
    }
}
