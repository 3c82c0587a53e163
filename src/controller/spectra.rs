//! Spectral channels: continuously controllable values with a bound setter.
//!
//! Setting a spectral value always emits it right away. The emission
//! depends on the channel: tempo becomes a tempo meta event, pitch bend a
//! pitch-bend message, and the rest are control changes.

use super::{meta, TrackController};
use crate::envelope::{EnvelopeTarget, OneShot, Triangle};
use crate::error::SinkResult;
use crate::sink::Sink;
use crate::timeline::Ticks;
use serde::{Deserialize, Serialize};

/// The controllable parameters that support sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralKind {
    Tempo,
    PitchBend,
    Expression,
    Modulation,
    Volume,
    Pan,
    DumperPedal,
    ReverbSendDepth,
    ChorusSendDepth,
    DelaySendDepth,
}

impl SpectralKind {
    pub const COUNT: usize = 10;

    pub const ALL: [SpectralKind; Self::COUNT] = [
        SpectralKind::Tempo,
        SpectralKind::PitchBend,
        SpectralKind::Expression,
        SpectralKind::Modulation,
        SpectralKind::Volume,
        SpectralKind::Pan,
        SpectralKind::DumperPedal,
        SpectralKind::ReverbSendDepth,
        SpectralKind::ChorusSendDepth,
        SpectralKind::DelaySendDepth,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Macro name for the absolute setter; `+`, `-`, `_` and `t` suffixes
    /// name the relative, one-shot and triangle forms.
    pub fn macro_name(self) -> &'static str {
        match self {
            SpectralKind::Tempo => "t",
            SpectralKind::PitchBend => "B",
            SpectralKind::Expression => "E",
            SpectralKind::Modulation => "M",
            SpectralKind::Volume => "V",
            SpectralKind::Pan => "P",
            SpectralKind::DumperPedal => "H",
            SpectralKind::ReverbSendDepth => "RSD",
            SpectralKind::ChorusSendDepth => "CSD",
            SpectralKind::DelaySendDepth => "DSD",
        }
    }

    /// Control change number, for the kinds emitted as CC.
    pub fn control_number(self) -> Option<u8> {
        match self {
            SpectralKind::Tempo | SpectralKind::PitchBend => None,
            SpectralKind::Expression => Some(0x0B),
            SpectralKind::Modulation => Some(0x01),
            SpectralKind::Volume => Some(0x07),
            SpectralKind::Pan => Some(0x0A),
            SpectralKind::DumperPedal => Some(0x40),
            SpectralKind::ReverbSendDepth => Some(0x5B),
            SpectralKind::ChorusSendDepth => Some(0x5D),
            SpectralKind::DelaySendDepth => Some(0x5E),
        }
    }
}

impl<S: Sink> TrackController<S> {
    /// The setter bound to each spectral kind.
    fn emit_spectral(&mut self, kind: SpectralKind, value: i32) -> SinkResult {
        match kind {
            SpectralKind::Tempo => {
                let bytes = [
                    (value / 0x10000) as u8,
                    (value % 0x10000 / 0x100) as u8,
                    (value % 0x100) as u8,
                ];
                self.meta(meta::TEMPO, &bytes)
            }
            SpectralKind::PitchBend => {
                let range = self.state.bend_range_keys;
                let raw = if range != 0 {
                    (value / 100).wrapping_mul(8192).wrapping_div(range)
                } else {
                    value
                };
                self.pitch_bend(raw)
            }
            _ => match kind.control_number() {
                Some(cc) => self.control_change(cc, value as u8),
                None => Ok(()),
            },
        }
    }
}

/// Mutable handle on one spectral channel of a controller.
pub struct Spectra<'a, S: Sink> {
    controller: &'a mut TrackController<S>,
    kind: SpectralKind,
}

impl<'a, S: Sink> Spectra<'a, S> {
    pub(super) fn new(controller: &'a mut TrackController<S>, kind: SpectralKind) -> Self {
        Self { controller, kind }
    }

    pub fn kind(&self) -> SpectralKind {
        self.kind
    }

    /// Last value set.
    pub fn value(&self) -> i32 {
        self.controller.spectral_values[self.kind.index()]
    }

    /// Stores and emits `value`.
    pub fn set(&mut self, value: i32) -> SinkResult {
        self.controller.spectral_values[self.kind.index()] = value;
        self.controller.emit_spectral(self.kind, value)
    }

    pub fn increase(&mut self, delta: i32) -> SinkResult {
        self.set(self.value().wrapping_add(delta))
    }

    pub fn decrease(&mut self, delta: i32) -> SinkResult {
        self.set(self.value().wrapping_sub(delta))
    }

    /// Harmonic-decay sweep from `start` to `end`; see [`OneShot`].
    pub fn one_shot(
        &mut self,
        start: i32,
        end: i32,
        start_delay: Ticks,
        length: Ticks,
        step: Ticks,
    ) -> SinkResult {
        OneShot {
            start,
            end,
            start_delay,
            length,
            step,
        }
        .run(self)
    }

    /// Oscillation around `start`; see [`Triangle`].
    pub fn triangle(&mut self, wave: Triangle) -> SinkResult {
        wave.run(self)
    }
}

impl<S: Sink> EnvelopeTarget for Spectra<'_, S> {
    fn position(&self) -> Ticks {
        self.controller.position()
    }

    fn advance(&mut self, ticks: Ticks) {
        self.controller.cursor.advance(ticks);
    }

    fn value(&self) -> i32 {
        Spectra::value(self)
    }

    fn set_value(&mut self, value: i32) -> SinkResult {
        self.set(value)
    }
}
