//! Error types shared by sinks, the controller and the macro table.
//!
//! Controller arithmetic never fails. The only fallible boundary is the
//! sink: a sink may be unable to represent a primitive (loops on a live
//! port) or its underlying writer/port may fail.

use thiserror::Error;

/// Errors raised by a [`Sink`](crate::sink::Sink) while emitting a primitive.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink has no way to represent this primitive.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// Writing serialized output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The MIDI output port rejected the message.
    #[error("MIDI port error: {0}")]
    Port(String),
}

/// Result alias for sink-facing operations.
pub type SinkResult<T = ()> = Result<T, SinkError>;

/// Errors raised when dispatching a macro by name.
#[derive(Debug, Error)]
pub enum MacroError {
    /// No macro is registered under this name.
    #[error("unknown macro: {0}")]
    Unknown(String),

    /// Too few or too many arguments were supplied.
    #[error("macro {name} expects {min}..={max} arguments, got {got}")]
    Arity {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },

    /// An argument had the wrong kind (e.g. text where a number was expected).
    #[error("macro {name}: argument {index} must be {expected}")]
    ArgumentKind {
        name: String,
        index: usize,
        expected: &'static str,
    },

    /// The dispatched operation failed in the sink.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message() {
        let err = SinkError::Unsupported {
            operation: "begin_loop",
        };
        assert_eq!(err.to_string(), "unsupported operation: begin_loop");
    }

    #[test]
    fn test_sink_error_is_transparent_in_macro_error() {
        let err: MacroError = SinkError::Port("closed".to_string()).into();
        assert_eq!(err.to_string(), "MIDI port error: closed");
    }
}
