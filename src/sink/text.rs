//! Text serialization sink.
//!
//! Renders primitives in the textual intermediate grammar consumed by
//! downstream MML tooling:
//!
//! - `[` opens a loop, `]N` closes it with repeat count N
//! - `:t1,t2` marks a loop break for the listed targets
//! - channel messages: `__MIDI { #90, #40, #64 } ` (status uppercase hex,
//!   data lowercase hex)
//! - meta events: `__MIDI_META { #51, #07, #a1, #20 } ` or
//!   `__MIDI_META { #03, "escaped \"text\"" } `
//!
//! The channel is not encoded: the text form is per-track already.

use super::{sysex_window, Sink};
use crate::error::SinkResult;
use std::fmt;
use std::io::{self, Write};

/// Sink that writes the textual event form to `W`, and debug lines to `D`.
pub struct TextSink<W: Write, D: Write = io::Stderr> {
    output: W,
    debug_output: D,
}

impl<W: Write> TextSink<W> {
    /// Creates a sink that sends debug lines to stderr.
    pub fn new(output: W) -> Self {
        Self::with_debug(output, io::stderr())
    }
}

impl<W: Write, D: Write> TextSink<W, D> {
    /// Creates a sink with a dedicated debug writer.
    pub fn with_debug(output: W, debug_output: D) -> Self {
        Self {
            output,
            debug_output,
        }
    }

    /// Borrows the event writer.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Borrows the debug writer.
    pub fn debug_output(&self) -> &D {
        &self.debug_output
    }

    /// Consumes the sink, returning both writers.
    pub fn into_inner(self) -> (W, D) {
        (self.output, self.debug_output)
    }

    /// Flushes the event writer.
    pub fn flush(&mut self) -> SinkResult {
        self.output.flush()?;
        Ok(())
    }
}

/// Escapes backslashes and double quotes for a quoted payload.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl<W: Write, D: Write> Sink for TextSink<W, D> {
    fn begin_loop(&mut self, _channel: u8) -> SinkResult {
        self.output.write_all(b"[")?;
        Ok(())
    }

    fn break_loop(&mut self, _channel: u8, targets: &[i32]) -> SinkResult {
        let joined = targets
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(self.output, ":{}", joined)?;
        Ok(())
    }

    fn end_loop(&mut self, _channel: u8, repeats: i32) -> SinkResult {
        write!(self.output, "]{}", repeats)?;
        Ok(())
    }

    fn midi_event2(&mut self, _channel: u8, status: u8, data: u8) -> SinkResult {
        write!(self.output, "__MIDI {{ #{:02X}, #{:02x} }} ", status, data)?;
        Ok(())
    }

    fn midi_event3(&mut self, _channel: u8, status: u8, data1: u8, data2: u8) -> SinkResult {
        write!(
            self.output,
            "__MIDI {{ #{:02X}, #{:02x}, #{:02x} }} ",
            status, data1, data2
        )?;
        Ok(())
    }

    fn midi_meta(&mut self, meta_type: u8, bytes: &[u8]) -> SinkResult {
        write!(self.output, "__MIDI_META {{ #{:02X}", meta_type)?;
        for b in bytes {
            write!(self.output, ", #{:02x}", b)?;
        }
        self.output.write_all(b" } ")?;
        Ok(())
    }

    fn midi_meta_text(&mut self, meta_type: u8, text: &str) -> SinkResult {
        write!(
            self.output,
            "__MIDI_META {{ #{:02X}, \"{}\" }} ",
            meta_type,
            escape_text(text)
        )?;
        Ok(())
    }

    fn midi_sysex(&mut self, bytes: &[u8], offset: usize, length: usize) -> SinkResult {
        let window = sysex_window(bytes, offset, length);
        self.output.write_all(b"__MIDI {")?;
        for (i, b) in window.iter().enumerate() {
            if i == 0 {
                write!(self.output, " #{:02X}", b)?;
            } else {
                write!(self.output, ", #{:02x}", b)?;
            }
        }
        self.output.write_all(b" } ")?;
        Ok(())
    }

    fn debug(&mut self, value: &dyn fmt::Display) {
        if let Err(e) = writeln!(self.debug_output, "{}", value) {
            tracing::warn!("debug output failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> TextSink<Vec<u8>, Vec<u8>> {
        TextSink::with_debug(Vec::new(), Vec::new())
    }

    fn text(sink: &TextSink<Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8(sink.output().clone()).unwrap()
    }

    #[test]
    fn test_primitive_loop() {
        let mut s = sink();
        s.begin_loop(0).unwrap();
        s.end_loop(0, 2).unwrap();
        assert_eq!(text(&s), "[]2");
    }

    #[test]
    fn test_break_targets() {
        let mut s = sink();
        s.begin_loop(0).unwrap();
        s.break_loop(0, &[1, 3]).unwrap();
        s.end_loop(0, 4).unwrap();
        assert_eq!(text(&s), "[:1,3]4");
    }

    #[test]
    fn test_three_byte_event() {
        let mut s = sink();
        s.midi_event3(5, 0x90, 0x40, 0x64).unwrap();
        assert_eq!(text(&s), "__MIDI { #90, #40, #64 } ");
    }

    #[test]
    fn test_two_byte_event() {
        let mut s = sink();
        s.midi_event2(0, 0xC0, 0x0A).unwrap();
        assert_eq!(text(&s), "__MIDI { #C0, #0a } ");
    }

    #[test]
    fn test_meta_bytes() {
        let mut s = sink();
        s.midi_meta(0x51, &[0x07, 0xA1, 0x20]).unwrap();
        assert_eq!(text(&s), "__MIDI_META { #51, #07, #a1, #20 } ");
    }

    #[test]
    fn test_meta_text_escaped() {
        let mut s = sink();
        s.midi_meta_text(3, r#"a "b" \c"#).unwrap();
        assert_eq!(text(&s), r#"__MIDI_META { #03, "a \"b\" \\c" } "#);
    }

    #[test]
    fn test_sysex_window() {
        let mut s = sink();
        s.midi_sysex(&[0x00, 0xF0, 0x7E, 0xF7], 1, 3).unwrap();
        assert_eq!(text(&s), "__MIDI { #F0, #7e, #f7 } ");
    }

    #[test]
    fn test_debug_goes_to_debug_writer() {
        let mut s = sink();
        s.debug(&"hello");
        assert!(s.output().is_empty());
        assert_eq!(String::from_utf8(s.debug_output().clone()).unwrap(), "hello\n");
    }
}
