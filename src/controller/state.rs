//! Per-channel performance state.

use crate::config::ChannelDefaults;
use crate::pitch::AccidentalTable;
use crate::timeline::{Length, Ticks};

/// Mutable performance parameters of one channel.
///
/// None of these values are range-checked; anything that ends up in a
/// MIDI byte is truncated when emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// MIDI channel (0-based).
    pub channel: u8,
    pub velocity: i32,
    /// Step applied by velocity increment/decrement.
    pub velocity_sensitivity: i32,
    pub octave: i32,
    /// Global transpose in semitones.
    pub transpose: i32,
    /// Key signature: accidental offset per pitch class.
    pub accidentals: AccidentalTable,
    /// Length used when a note gives none.
    pub default_length: Length,
    /// Ticks between the nominal note start and the note-on.
    pub key_delay: Ticks,
    pub gate_relative: i32,
    pub gate_denominator: i32,
    /// Ticks subtracted from the relative gate.
    pub gate_absolute: Ticks,
    /// Semitone range for cent-mode pitch bend; 0 sends raw values.
    pub bend_range_keys: i32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::from(&ChannelDefaults::default())
    }
}

impl From<&ChannelDefaults> for ChannelState {
    fn from(defaults: &ChannelDefaults) -> Self {
        Self {
            channel: defaults.channel,
            velocity: defaults.velocity,
            velocity_sensitivity: defaults.velocity_sensitivity,
            octave: defaults.octave,
            transpose: defaults.transpose,
            accidentals: AccidentalTable::default(),
            default_length: defaults.default_length,
            key_delay: defaults.key_delay,
            gate_relative: defaults.gate_relative,
            gate_denominator: defaults.gate_denominator,
            gate_absolute: defaults.gate_absolute,
            bend_range_keys: 0,
        }
    }
}

impl ChannelState {
    /// Gate length for a note whose gate basis is `basis` ticks.
    ///
    /// `floor(basis * relative / denominator) - absolute`. A zero
    /// denominator keeps the whole basis.
    pub fn gate_ticks(&self, basis: Ticks) -> Ticks {
        let product = basis as i64 * self.gate_relative as i64;
        let relative = if self.gate_denominator == 0 {
            basis as i64
        } else {
            floor_div(product, self.gate_denominator as i64)
        };
        (relative as i32).wrapping_sub(self.gate_absolute)
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_gate_by_default() {
        let state = ChannelState::default();
        assert_eq!(state.gate_ticks(48), 48);
    }

    #[test]
    fn test_relative_and_absolute_gate() {
        let mut state = ChannelState::default();
        state.gate_relative = 7;
        assert_eq!(state.gate_ticks(48), 42);
        state.gate_absolute = 2;
        assert_eq!(state.gate_ticks(48), 40);
    }

    #[test]
    fn test_gate_floors() {
        let mut state = ChannelState::default();
        state.gate_relative = 3;
        assert_eq!(state.gate_ticks(5), 1); // 15 / 8
        assert_eq!(state.gate_ticks(-5), -2); // -15 / 8 floored
    }

    #[test]
    fn test_zero_denominator_keeps_basis() {
        let mut state = ChannelState::default();
        state.gate_denominator = 0;
        assert_eq!(state.gate_ticks(30), 30);
    }
}
