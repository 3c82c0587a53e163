//! The per-track performance controller.
//!
//! A [`TrackController`] owns the timeline cursor and the channel state of a
//! single track and turns high-level operations (notes, control sweeps,
//! loops, meta events) into primitive calls on its [`Sink`]. Every call is
//! synchronous: arithmetic first, then straight into the sink on the
//! caller's thread. Separate tracks use separate controllers and share
//! nothing.

mod spectra;
mod state;

pub use spectra::{Spectra, SpectralKind};
pub use state::ChannelState;

use crate::config::EngineConfig;
use crate::error::SinkResult;
use crate::pitch::{resolve_key, Accidental, PitchClass};
use crate::sink::Sink;
use crate::timeline::{Length, Resolution, Ticks, TimelineCursor};
use std::fmt;

/// Channel message status bytes (channel nibble left to the sink).
mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;
}

/// Meta event types.
pub mod meta {
    pub const TEXT: u8 = 0x01;
    pub const COPYRIGHT: u8 = 0x02;
    pub const TRACK_NAME: u8 = 0x03;
    pub const INSTRUMENT_NAME: u8 = 0x04;
    pub const LYRIC: u8 = 0x05;
    pub const MARKER: u8 = 0x06;
    pub const CUE: u8 = 0x07;
    pub const TEMPO: u8 = 0x51;
    pub const TIME_SIGNATURE: u8 = 0x58;
}

const GM_SYSTEM_ON: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7];
const XG_RESET: [u8; 9] = [0xF0, 0x43, 0x10, 0x4C, 0x00, 0x00, 0x7E, 0x00, 0xF7];

/// Optional overrides for a single note.
///
/// `None` (or any negative value) falls back to the channel default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteOptions {
    /// Ticks the timeline advances by.
    pub step: Option<Ticks>,
    /// Gate basis in ticks; defaults to the effective step.
    pub gate: Option<Ticks>,
    pub velocity: Option<i32>,
    pub key_delay: Option<Ticks>,
    pub note_off_velocity: u8,
}

impl NoteOptions {
    /// Options with only the step set.
    pub fn step(step: Ticks) -> Self {
        Self {
            step: Some(step),
            ..Self::default()
        }
    }

    /// Builds options from `-1`-style sentinels, where negative means unset.
    pub fn from_sentinels(
        step: i32,
        gate: i32,
        velocity: i32,
        key_delay: i32,
        note_off_velocity: u8,
    ) -> Self {
        let given = |v: i32| (v >= 0).then_some(v);
        Self {
            step: given(step),
            gate: given(gate),
            velocity: given(velocity),
            key_delay: given(key_delay),
            note_off_velocity,
        }
    }
}

/// Drives one track: timeline position, channel state and spectral values.
pub struct TrackController<S: Sink> {
    sink: S,
    resolution: Resolution,
    cursor: TimelineCursor,
    state: ChannelState,
    spectral_values: [i32; SpectralKind::COUNT],
}

impl<S: Sink> TrackController<S> {
    /// Creates a controller with default configuration.
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, &EngineConfig::default())
    }

    /// Creates a controller from an explicit configuration.
    pub fn with_config(sink: S, config: &EngineConfig) -> Self {
        Self {
            sink,
            resolution: config.resolution(),
            cursor: TimelineCursor::new(),
            state: ChannelState::from(&config.channel),
            spectral_values: [0; SpectralKind::COUNT],
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the controller, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ChannelState {
        &mut self.state
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    // ---- Timeline -------------------------------------------------------

    /// Current timeline position in ticks.
    pub fn position(&self) -> Ticks {
        self.cursor.position()
    }

    /// Overwrites the timeline position.
    pub fn set_position(&mut self, ticks: Ticks) {
        self.cursor.jump_to(ticks);
    }

    /// Advances by a symbolic length.
    pub fn step(&mut self, length: Length) {
        self.cursor.advance(self.resolution.to_ticks(length));
    }

    /// Jumps to the tick equivalent of a symbolic length.
    pub fn jump_to(&mut self, length: Length) {
        self.cursor.jump_to(self.resolution.to_ticks(length));
    }

    /// Moves back by a symbolic length.
    pub fn rewind(&mut self, length: Length) {
        self.cursor.rewind(self.resolution.to_ticks(length));
    }

    /// Advances by `ticks` without emitting anything.
    pub fn rest(&mut self, ticks: Ticks) {
        self.cursor.advance(ticks);
    }

    /// Default note length in ticks.
    pub fn default_length_ticks(&self) -> Ticks {
        self.resolution.to_ticks(self.state.default_length)
    }

    // ---- Channel and diagnostics ---------------------------------------

    /// Selects the channel with a 1-based number.
    pub fn set_channel_natural(&mut self, channel: u8) {
        self.state.channel = channel.wrapping_sub(1);
    }

    /// Sends a value to the sink's debug output.
    pub fn debug(&mut self, value: &dyn fmt::Display) {
        self.sink.debug(value);
    }

    /// Reports through the debug output when the position is not `expected`.
    ///
    /// Returns whether the assertion held.
    pub fn assert_step(&mut self, expected: Ticks, label: &str) -> bool {
        let actual = self.position();
        if expected == actual {
            return true;
        }
        tracing::warn!(label, expected, actual, "step assertion failed");
        let message = format!(
            "WARNING: step assertion failed: {} (expected: {}, actual: {})",
            label, expected, actual
        );
        self.sink.debug(&message);
        false
    }

    // ---- Raw MIDI -------------------------------------------------------

    pub fn note_on(&mut self, key: u8, velocity: u8) -> SinkResult {
        self.sink
            .midi_event3(self.state.channel, status::NOTE_ON, key, velocity)
    }

    pub fn note_off(&mut self, key: u8, velocity: u8) -> SinkResult {
        self.sink
            .midi_event3(self.state.channel, status::NOTE_OFF, key, velocity)
    }

    pub fn poly_aftertouch(&mut self, key: u8, pressure: u8) -> SinkResult {
        self.sink
            .midi_event3(self.state.channel, status::POLY_AFTERTOUCH, key, pressure)
    }

    pub fn control_change(&mut self, controller: u8, value: u8) -> SinkResult {
        self.sink
            .midi_event3(self.state.channel, status::CONTROL_CHANGE, controller, value)
    }

    pub fn program_change(&mut self, program: u8) -> SinkResult {
        self.sink
            .midi_event2(self.state.channel, status::PROGRAM_CHANGE, program)
    }

    pub fn channel_aftertouch(&mut self, pressure: u8) -> SinkResult {
        self.sink
            .midi_event2(self.state.channel, status::CHANNEL_AFTERTOUCH, pressure)
    }

    /// Pitch bend split into two 7-bit bytes (`value % 0x80`, `value / 0x80`).
    pub fn pitch_bend(&mut self, value: i32) -> SinkResult {
        let lsb = (value % 0x80) as u8;
        let msb = (value / 0x80) as u8;
        self.sink
            .midi_event3(self.state.channel, status::PITCH_BEND, lsb, msb)
    }

    pub fn meta(&mut self, meta_type: u8, bytes: &[u8]) -> SinkResult {
        self.sink.midi_meta(meta_type, bytes)
    }

    pub fn meta_text(&mut self, meta_type: u8, text: &str) -> SinkResult {
        self.sink.midi_meta_text(meta_type, text)
    }

    pub fn sysex(&mut self, bytes: &[u8]) -> SinkResult {
        self.sink.midi_sysex(bytes, 0, bytes.len())
    }

    pub fn sysex_range(&mut self, bytes: &[u8], offset: usize, length: usize) -> SinkResult {
        self.sink.midi_sysex(bytes, offset, length)
    }

    // ---- Programs and controllers ---------------------------------------

    /// Bank select (MSB, LSB) followed by a program change.
    pub fn program_with_bank(&mut self, program: u8, bank_msb: u8, bank_lsb: u8) -> SinkResult {
        self.control_change(0x00, bank_msb)?;
        self.control_change(0x20, bank_lsb)?;
        self.program_change(program)
    }

    /// Sets the tempo value and emits the tempo meta event.
    ///
    /// The value is the one stored for [`SpectralKind::Tempo`], so a later
    /// `t+`/`t-` or tempo sweep continues from it.
    pub fn set_tempo(&mut self, value: i32) -> SinkResult {
        self.spectra(SpectralKind::Tempo).set(value)
    }

    /// Sets the pitch bend (in cents when a bend range is configured).
    ///
    /// Shares its stored value with [`SpectralKind::PitchBend`], so `B+`,
    /// `B-` and bend sweeps continue from it.
    pub fn set_bend(&mut self, value: i32) -> SinkResult {
        self.spectra(SpectralKind::PitchBend).set(value)
    }

    /// Sets the semitone range used to interpret bend values as cents.
    pub fn set_bend_cent_mode(&mut self, range_keys: i32) {
        self.state.bend_range_keys = range_keys;
    }

    /// Sets the pitch bend sensitivity via RPN 0/0 and data entry.
    pub fn pitch_bend_sensitivity(&mut self, semitones: u8) -> SinkResult {
        self.rpn(0, 0)?;
        self.data_entry(semitones, 0)
    }

    pub fn data_entry_msb(&mut self, value: u8) -> SinkResult {
        self.control_change(0x06, value)
    }

    pub fn data_entry_lsb(&mut self, value: u8) -> SinkResult {
        self.control_change(0x26, value)
    }

    pub fn data_entry(&mut self, msb: u8, lsb: u8) -> SinkResult {
        self.data_entry_msb(msb)?;
        self.data_entry_lsb(lsb)
    }

    pub fn sostenuto(&mut self, value: u8) -> SinkResult {
        self.control_change(0x42, value)
    }

    pub fn soft_pedal(&mut self, value: u8) -> SinkResult {
        self.control_change(0x43, value)
    }

    pub fn legato(&mut self, value: u8) -> SinkResult {
        self.control_change(0x54, value)
    }

    pub fn nrpn_msb(&mut self, value: u8) -> SinkResult {
        self.control_change(0x63, value)
    }

    pub fn nrpn_lsb(&mut self, value: u8) -> SinkResult {
        self.control_change(0x62, value)
    }

    pub fn nrpn(&mut self, msb: u8, lsb: u8) -> SinkResult {
        self.nrpn_msb(msb)?;
        self.nrpn_lsb(lsb)
    }

    pub fn rpn_msb(&mut self, value: u8) -> SinkResult {
        self.control_change(0x65, value)
    }

    pub fn rpn_lsb(&mut self, value: u8) -> SinkResult {
        self.control_change(0x64, value)
    }

    pub fn rpn(&mut self, msb: u8, lsb: u8) -> SinkResult {
        self.rpn_msb(msb)?;
        self.rpn_lsb(lsb)
    }

    /// Handle on one of the spectral channels.
    pub fn spectra(&mut self, kind: SpectralKind) -> Spectra<'_, S> {
        Spectra::new(self, kind)
    }

    // ---- Meta events ----------------------------------------------------

    pub fn text(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::TEXT, value)
    }

    pub fn copyright(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::COPYRIGHT, value)
    }

    pub fn track_name(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::TRACK_NAME, value)
    }

    pub fn instrument_name(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::INSTRUMENT_NAME, value)
    }

    pub fn lyric(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::LYRIC, value)
    }

    pub fn marker(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::MARKER, value)
    }

    pub fn cue(&mut self, value: &str) -> SinkResult {
        self.meta_text(meta::CUE, value)
    }

    /// Time signature meta event.
    ///
    /// Denominators 2, 4, 8 and 16 are written as powers of two; any other
    /// value is passed through unchanged.
    pub fn beat(&mut self, numerator: u8, denominator: u8) -> SinkResult {
        let power = match denominator {
            2 => 1,
            4 => 2,
            8 => 3,
            16 => 4,
            other => other,
        };
        self.meta(meta::TIME_SIGNATURE, &[numerator, power, 0, 0])
    }

    // ---- Note flavors ---------------------------------------------------

    pub fn increase_velocity(&mut self) {
        self.state.velocity = self
            .state
            .velocity
            .wrapping_add(self.state.velocity_sensitivity);
    }

    pub fn decrease_velocity(&mut self) {
        self.state.velocity = self
            .state
            .velocity
            .wrapping_sub(self.state.velocity_sensitivity);
    }

    pub fn increase_octave(&mut self) {
        self.state.octave = self.state.octave.wrapping_add(1);
    }

    pub fn decrease_octave(&mut self) {
        self.state.octave = self.state.octave.wrapping_sub(1);
    }

    /// Sets the key-signature accidental of one pitch class.
    ///
    /// `Accidental::Base` leaves the entry unchanged.
    pub fn set_key_signature(&mut self, class: PitchClass, accidental: Accidental) {
        if let Some(offset) = accidental.fixed_offset() {
            self.state.accidentals.set(class, offset);
        }
    }

    // ---- Notes, rests and loops ------------------------------------------

    /// Plays `key`, moving the timeline forward by exactly the effective step.
    ///
    /// The note-on is placed after the key delay and the note-off after the
    /// gate; the cursor then finishes the step and takes the key delay back.
    pub fn note(&mut self, key: u8, options: NoteOptions) -> SinkResult {
        let step = options
            .step
            .filter(|s| *s >= 0)
            .unwrap_or_else(|| self.default_length_ticks());
        let velocity = options
            .velocity
            .filter(|v| *v >= 0)
            .unwrap_or(self.state.velocity);
        let key_delay = options
            .key_delay
            .filter(|d| *d >= 0)
            .unwrap_or(self.state.key_delay);
        let gate_basis = options.gate.filter(|g| *g >= 0).unwrap_or(step);
        let gate = self.state.gate_ticks(gate_basis);

        let start = self.cursor.position();
        let result = self.emit_note(
            key,
            velocity as u8,
            options.note_off_velocity,
            key_delay,
            gate,
        );
        if result.is_err() {
            // a failed note leaves the timeline where it was
            self.cursor.jump_to(start);
            return result;
        }
        self.cursor.advance(step.wrapping_sub(gate));
        self.cursor.rewind(key_delay);
        Ok(())
    }

    fn emit_note(
        &mut self,
        key: u8,
        velocity: u8,
        off_velocity: u8,
        key_delay: Ticks,
        gate: Ticks,
    ) -> SinkResult {
        self.cursor.advance(key_delay);
        self.note_on(key, velocity)?;
        self.cursor.advance(gate);
        self.note_off(key, off_velocity)
    }

    /// Plays a pitch class in the current octave, transpose and key signature.
    pub fn play(
        &mut self,
        class: PitchClass,
        accidental: Accidental,
        options: NoteOptions,
    ) -> SinkResult {
        let key = resolve_key(
            class,
            accidental,
            self.state.octave,
            self.state.transpose,
            &self.state.accidentals,
        );
        self.note(key as u8, options)
    }

    pub fn begin_loop(&mut self) -> SinkResult {
        self.sink.begin_loop(self.state.channel)
    }

    pub fn break_loop(&mut self, targets: &[i32]) -> SinkResult {
        self.sink.break_loop(self.state.channel, targets)
    }

    pub fn end_loop(&mut self, repeats: i32) -> SinkResult {
        self.sink.end_loop(self.state.channel, repeats)
    }

    // ---- System exclusive -----------------------------------------------

    pub fn gm_system_on(&mut self) -> SinkResult {
        self.sysex(&GM_SYSTEM_ON)
    }

    pub fn xg_reset(&mut self) -> SinkResult {
        self.sysex(&XG_RESET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::sink::{LiveSink, MidiPort, TextSink};
    use std::io;

    type TextController = TrackController<TextSink<Vec<u8>, Vec<u8>>>;

    fn controller() -> TextController {
        TrackController::new(TextSink::with_debug(Vec::new(), Vec::new()))
    }

    fn output(tc: &TextController) -> String {
        String::from_utf8(tc.sink().output().clone()).unwrap()
    }

    #[test]
    fn test_simple_loop() {
        let mut tc = controller();
        tc.begin_loop().unwrap();
        tc.end_loop(2).unwrap();
        assert_eq!(output(&tc), "[]2");
    }

    #[test]
    fn test_simple_note() {
        let mut tc = controller();
        tc.note(0x40, NoteOptions::default()).unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI { #90, #40, #64 } __MIDI { #80, #40, #00 } "
        );
        assert_eq!(tc.position(), 48);
    }

    #[test]
    fn test_pitch_bend_one_shot_golden() {
        let mut tc = controller();
        tc.spectra(SpectralKind::PitchBend)
            .one_shot(0, -200, 0, 48, 4)
            .unwrap();
        let expected = "__MIDI { #E0, #00, #00 } __MIDI { #E0, #b8, #ff } \
                        __MIDI { #E0, #d4, #fe } __MIDI { #E0, #92, #fe } \
                        __MIDI { #E0, #e0, #fd } __MIDI { #E0, #b8, #fd } \
                        __MIDI { #E0, #97, #fd } __MIDI { #E0, #fb, #fc } \
                        __MIDI { #E0, #e2, #fc } __MIDI { #E0, #cc, #fc } \
                        __MIDI { #E0, #b8, #fc } __MIDI { #E0, #a6, #fc } \
                        __MIDI { #E0, #96, #fc } __MIDI { #E0, #b8, #ff } ";
        assert_eq!(output(&tc), expected);
        assert_eq!(output(&tc).matches("__MIDI {").count(), 14);
    }

    #[test]
    fn test_key_delay_and_gate_timing() {
        let mut tc = controller();
        tc.state_mut().gate_relative = 6;
        tc.set_position(100);
        tc.note(
            60,
            NoteOptions {
                step: Some(48),
                key_delay: Some(5),
                ..NoteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(tc.position(), 148);
    }

    #[test]
    fn test_note_overrides() {
        let mut tc = controller();
        tc.note(
            0x3C,
            NoteOptions {
                velocity: Some(0x20),
                note_off_velocity: 0x10,
                ..NoteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI { #90, #3c, #20 } __MIDI { #80, #3c, #10 } "
        );
    }

    #[test]
    fn test_sentinel_options() {
        let opts = NoteOptions::from_sentinels(-1, 24, -1, 0, 0);
        assert_eq!(opts.step, None);
        assert_eq!(opts.gate, Some(24));
        assert_eq!(opts.velocity, None);
        assert_eq!(opts.key_delay, Some(0));
    }

    #[test]
    fn test_velocity_sensitivity_unclamped() {
        let mut tc = controller();
        for _ in 0..10 {
            tc.increase_velocity();
        }
        assert_eq!(tc.state().velocity, 140);
        tc.state_mut().velocity_sensitivity = 10;
        tc.decrease_velocity();
        assert_eq!(tc.state().velocity, 130);
    }

    #[test]
    fn test_play_uses_octave_and_key_signature() {
        let mut tc = controller();
        tc.set_key_signature(PitchClass::F, Accidental::Sharp);
        tc.play(PitchClass::F, Accidental::Base, NoteOptions::step(12))
            .unwrap();
        tc.increase_octave();
        tc.play(PitchClass::C, Accidental::Flat, NoteOptions::step(12))
            .unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI { #90, #36, #64 } __MIDI { #80, #36, #00 } \
             __MIDI { #90, #3b, #64 } __MIDI { #80, #3b, #00 } "
        );
        assert_eq!(tc.position(), 24);
    }

    #[test]
    fn test_length_operators() {
        let mut tc = controller();
        tc.step(Length(4));
        tc.step(Length(8));
        assert_eq!(tc.position(), 72);
        tc.rewind(Length(2));
        assert_eq!(tc.position(), -24);
        tc.jump_to(Length(1));
        assert_eq!(tc.position(), 192);
        tc.rest(8);
        assert_eq!(tc.position(), 200);
    }

    #[test]
    fn test_program_with_bank() {
        let mut tc = controller();
        tc.set_channel_natural(2);
        assert_eq!(tc.state().channel, 1);
        tc.program_with_bank(5, 1, 2).unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI { #B0, #00, #01 } __MIDI { #B0, #20, #02 } __MIDI { #C0, #05 } "
        );
    }

    #[test]
    fn test_tempo_meta_bytes() {
        let mut tc = controller();
        tc.set_tempo(500_000).unwrap();
        assert_eq!(output(&tc), "__MIDI_META { #51, #07, #a1, #20 } ");
        assert_eq!(tc.spectra(SpectralKind::Tempo).value(), 500_000);
    }

    #[test]
    fn test_tempo_increase_continues_from_set_tempo() {
        let mut tc = controller();
        tc.set_tempo(500_000).unwrap();
        tc.spectra(SpectralKind::Tempo).increase(10).unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI_META { #51, #07, #a1, #20 } __MIDI_META { #51, #07, #a1, #2a } "
        );
    }

    #[test]
    fn test_bend_cent_mode() {
        let mut tc = controller();
        tc.set_bend_cent_mode(2);
        // 200 cents over a 2-key range: 200 / 100 * 8192 / 2 = 8192
        tc.set_bend(200).unwrap();
        assert_eq!(output(&tc), "__MIDI { #E0, #00, #40 } ");
    }

    #[test]
    fn test_pitch_bend_sensitivity() {
        let mut tc = controller();
        tc.pitch_bend_sensitivity(12).unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI { #B0, #65, #00 } __MIDI { #B0, #64, #00 } \
             __MIDI { #B0, #06, #0c } __MIDI { #B0, #26, #00 } "
        );
    }

    #[test]
    fn test_beat_denominator_power() {
        let mut tc = controller();
        tc.beat(3, 8).unwrap();
        tc.beat(5, 5).unwrap();
        assert_eq!(
            output(&tc),
            "__MIDI_META { #58, #03, #03, #00, #00 } __MIDI_META { #58, #05, #05, #00, #00 } "
        );
    }

    #[test]
    fn test_text_meta() {
        let mut tc = controller();
        tc.track_name("Lead").unwrap();
        assert_eq!(output(&tc), "__MIDI_META { #03, \"Lead\" } ");
    }

    #[test]
    fn test_gm_system_on() {
        let mut tc = controller();
        tc.gm_system_on().unwrap();
        assert_eq!(output(&tc), "__MIDI { #F0, #7e, #7f, #09, #01, #f7 } ");
    }

    #[test]
    fn test_assert_step_reports_mismatch() {
        let mut tc = controller();
        tc.rest(10);
        assert!(tc.assert_step(10, "ok"));
        assert!(!tc.assert_step(48, "bar 1"));
        let debug = String::from_utf8(tc.sink().debug_output().clone()).unwrap();
        assert_eq!(
            debug,
            "WARNING: step assertion failed: bar 1 (expected: 48, actual: 10)\n"
        );
    }

    #[test]
    fn test_borrowed_sink() {
        let mut sink = TextSink::with_debug(Vec::new(), Vec::new());
        {
            let mut tc = TrackController::new(&mut sink);
            tc.control_change(0x07, 100).unwrap();
        }
        assert_eq!(sink.output().as_slice(), b"__MIDI { #B0, #07, #64 } ");
    }

    #[test]
    fn test_live_sink_rejects_loops() {
        let mut tc = TrackController::new(LiveSink::new(Vec::<Vec<u8>>::new()));
        tc.state_mut().channel = 2;
        tc.note(0x40, NoteOptions::default()).unwrap();
        assert!(matches!(
            tc.begin_loop(),
            Err(SinkError::Unsupported { .. })
        ));
        let sent = tc.into_sink().into_port();
        assert_eq!(sent, vec![vec![0x92, 0x40, 0x64], vec![0x82, 0x40, 0x00]]);
    }

    #[test]
    fn test_live_sink_rejects_meta() {
        let mut tc = TrackController::new(LiveSink::new(Vec::<Vec<u8>>::new()));
        assert!(matches!(
            tc.set_tempo(500_000),
            Err(SinkError::Unsupported { operation: "midi_meta" })
        ));
        assert!(matches!(
            tc.track_name("Lead"),
            Err(SinkError::Unsupported { operation: "midi_meta_text" })
        ));
        assert!(tc.into_sink().into_port().is_empty());
    }

    /// Port that accepts `remaining` messages, then fails.
    struct ClosingPort {
        remaining: usize,
        sent: Vec<Vec<u8>>,
    }

    impl MidiPort for ClosingPort {
        fn send(&mut self, bytes: &[u8]) -> SinkResult {
            if self.remaining == 0 {
                return Err(SinkError::Port("closed".to_string()));
            }
            self.remaining -= 1;
            self.sent.push(bytes.to_vec());
            Ok(())
        }
    }

    fn closing(remaining: usize) -> TrackController<LiveSink<ClosingPort>> {
        TrackController::new(LiveSink::new(ClosingPort {
            remaining,
            sent: Vec::new(),
        }))
    }

    #[test]
    fn test_failed_note_keeps_position() {
        for remaining in [0, 1] {
            let mut tc = closing(remaining);
            tc.state_mut().key_delay = 7;
            tc.set_position(96);
            let result = tc.note(60, NoteOptions::step(48));
            assert!(matches!(result, Err(SinkError::Port(_))));
            assert_eq!(tc.position(), 96);
            assert_eq!(tc.sink().port().sent.len(), remaining);
        }

        let mut tc = closing(2);
        tc.state_mut().key_delay = 7;
        tc.note(60, NoteOptions::step(48)).unwrap();
        assert_eq!(tc.position(), 48);
    }

    #[test]
    fn test_failed_envelope_keeps_position() {
        let mut tc = closing(4);
        tc.set_position(10);
        let result = tc.spectra(SpectralKind::Volume).one_shot(0, 100, 0, 48, 4);
        assert!(result.is_err());
        assert_eq!(tc.position(), 10);
        assert_eq!(tc.sink().port().sent.len(), 4);
    }

    /// Writer that fails every call.
    struct BrokenWriter;

    impl io::Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "debug closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "debug closed"))
        }
    }

    #[test]
    fn test_broken_debug_output_does_not_stop_timeline() {
        let mut tc = TrackController::new(TextSink::with_debug(Vec::new(), BrokenWriter));
        assert!(!tc.assert_step(12, "bar 1"));
        tc.debug(&"still going");
        tc.note(0x40, NoteOptions::step(48)).unwrap();
        assert_eq!(tc.position(), 48);
        assert_eq!(
            tc.sink().output().as_slice(),
            b"__MIDI { #90, #40, #64 } __MIDI { #80, #40, #00 } ".as_slice()
        );
    }
}
