//! Static macro table.
//!
//! Maps macro names (as an MML compiler emits them) to controller
//! operations together with their parameter kinds. The table is built once
//! per process and is read-only afterwards; dispatch is a plain lookup and
//! `match`, with no runtime type inspection.
//!
//! Naming follows the usual MML conventions:
//!
//! - spectral channels: `B` sets, `B+`/`B-` adjust, `B_` sweeps, `Bt` oscillates
//! - notes: `c`, `c-`, `c=`, `c+` (key signature, flat, natural, sharp)
//! - key signature: `Kc+`, `Kc-`, `Kc=`

use crate::controller::{meta, NoteOptions, SpectralKind, TrackController};
use crate::envelope::{OneShot, Triangle};
use crate::error::MacroError;
use crate::pitch::{Accidental, PitchClass};
use crate::sink::Sink;
use crate::timeline::{Length, Ticks};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// The kind of value a macro parameter takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Integer truncated to one byte on use.
    Byte,
    Int,
    /// Note length denominator (4 = quarter note).
    Length,
    Text,
    /// Either a number or text.
    Any,
    /// Any number of integers; only valid as the last parameter.
    Variadic,
}

impl ParamKind {
    fn accepts(self, arg: &MacroArg) -> bool {
        match (self, arg) {
            (ParamKind::Any, _) => true,
            (ParamKind::Text, MacroArg::Text(_)) => true,
            (ParamKind::Text, MacroArg::Int(_)) => false,
            (_, MacroArg::Int(_)) => true,
            (_, MacroArg::Text(_)) => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ParamKind::Text => "text",
            ParamKind::Any => "a value",
            _ => "a number",
        }
    }
}

/// A macro argument as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MacroArg {
    Int(i32),
    Text(String),
}

impl fmt::Display for MacroArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroArg::Int(v) => write!(f, "{}", v),
            MacroArg::Text(s) => f.write_str(s),
        }
    }
}

/// The operation a macro dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MacroOp {
    Channel,
    Debug,
    AssertStep,
    ProgramWithBank,
    Tempo,
    BendCentMode,
    Bend,
    PitchBendSensitivity,
    SpectraSet(SpectralKind),
    SpectraIncrease(SpectralKind),
    SpectraDecrease(SpectralKind),
    SpectraOneShot(SpectralKind),
    SpectraTriangle(SpectralKind),
    DataEntryMsb,
    DataEntryLsb,
    DataEntry,
    Sostenuto,
    SoftPedal,
    Legato,
    NrpnMsb,
    NrpnLsb,
    Nrpn,
    RpnMsb,
    RpnLsb,
    Rpn,
    MetaText(u8),
    Beat,
    Velocity,
    IncreaseVelocity,
    DecreaseVelocity,
    DefaultLength,
    KeyDelay,
    GateDenominator,
    GateRelative,
    GateAbsolute,
    Octave,
    IncreaseOctave,
    DecreaseOctave,
    Transpose,
    KeySignature(PitchClass, Accidental),
    Note,
    Play(PitchClass, Accidental),
    Rest,
    BeginLoop,
    BreakLoop,
    EndLoop,
    GmSystemOn,
    XgReset,
}

/// One entry of the macro table.
#[derive(Debug, Clone, Serialize)]
pub struct MacroDescriptor {
    pub name: String,
    pub params: &'static [ParamKind],
    /// Number of leading parameters that must be supplied.
    pub required: usize,
    pub op: MacroOp,
}

impl MacroDescriptor {
    /// Maximum argument count, or `None` for variadic macros.
    pub fn max_args(&self) -> Option<usize> {
        match self.params.last() {
            Some(ParamKind::Variadic) => None,
            _ => Some(self.params.len()),
        }
    }

    fn check(&self, args: &[MacroArg]) -> Result<(), MacroError> {
        let max = self.max_args().unwrap_or(usize::MAX);
        if args.len() < self.required || args.len() > max {
            return Err(MacroError::Arity {
                name: self.name.clone(),
                min: self.required,
                max,
                got: args.len(),
            });
        }
        for (index, arg) in args.iter().enumerate() {
            let kind = self
                .params
                .get(index)
                .or(self.params.last())
                .copied()
                .unwrap_or(ParamKind::Any);
            if !kind.accepts(arg) {
                return Err(MacroError::ArgumentKind {
                    name: self.name.clone(),
                    index,
                    expected: kind.describe(),
                });
            }
        }
        Ok(())
    }
}

use ParamKind::{Any, Byte, Int, Length as Len, Text, Variadic};

const NONE: &[ParamKind] = &[];
const BYTE: &[ParamKind] = &[Byte];
const BYTE2: &[ParamKind] = &[Byte, Byte];
const BYTE3: &[ParamKind] = &[Byte, Byte, Byte];
const INT: &[ParamKind] = &[Int];
const LENGTH: &[ParamKind] = &[Len];
const TEXT: &[ParamKind] = &[Text];
const ANY: &[ParamKind] = &[Any];
const VARIADIC: &[ParamKind] = &[Variadic];
const ASSERT_STEP: &[ParamKind] = &[Len, Text];
const ONE_SHOT: &[ParamKind] = &[Int, Int, Len, Len, Int];
const TRIANGLE: &[ParamKind] = &[Int, Int, Len, Len, Int, Int, Int, Int];
const NOTE: &[ParamKind] = &[Byte, Int, Int, Int, Int, Byte];
const PLAY: &[ParamKind] = &[Int, Int, Int, Int, Byte];

/// Read-only name → operation table.
#[derive(Debug)]
pub struct MacroTable {
    entries: Vec<MacroDescriptor>,
    index: HashMap<String, usize>,
}

impl MacroTable {
    /// The process-wide table, built on first use.
    pub fn global() -> &'static MacroTable {
        static TABLE: OnceLock<MacroTable> = OnceLock::new();
        TABLE.get_or_init(MacroTable::build)
    }

    fn build() -> Self {
        let mut table = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };

        table.add("CH", BYTE, 1, MacroOp::Channel);
        table.add("DEBUG", ANY, 1, MacroOp::Debug);
        table.add("ASSERT_STEP", ASSERT_STEP, 2, MacroOp::AssertStep);
        table.add("@", BYTE3, 3, MacroOp::ProgramWithBank);
        table.add("TEMPO", INT, 1, MacroOp::Tempo);
        table.add("BEND_CENT_MODE", INT, 1, MacroOp::BendCentMode);
        table.add("BEND", INT, 1, MacroOp::Bend);
        table.add("PITCH_BEND_SENSITIVITY", BYTE, 1, MacroOp::PitchBendSensitivity);

        for kind in SpectralKind::ALL {
            let name = kind.macro_name();
            table.add(name, INT, 1, MacroOp::SpectraSet(kind));
            table.add(format!("{name}+"), INT, 1, MacroOp::SpectraIncrease(kind));
            table.add(format!("{name}-"), INT, 1, MacroOp::SpectraDecrease(kind));
            table.add(format!("{name}_"), ONE_SHOT, 4, MacroOp::SpectraOneShot(kind));
            table.add(format!("{name}t"), TRIANGLE, 8, MacroOp::SpectraTriangle(kind));
        }

        table.add("DTEM", BYTE, 1, MacroOp::DataEntryMsb);
        table.add("DTEL", BYTE, 1, MacroOp::DataEntryLsb);
        table.add("DTE", BYTE2, 2, MacroOp::DataEntry);
        table.add("SOS", BYTE, 1, MacroOp::Sostenuto);
        table.add("SOFT", BYTE, 1, MacroOp::SoftPedal);
        table.add("LEGATO", BYTE, 1, MacroOp::Legato);
        table.add("NRPNM", BYTE, 1, MacroOp::NrpnMsb);
        table.add("NRPNL", BYTE, 1, MacroOp::NrpnLsb);
        table.add("NRPN", BYTE2, 2, MacroOp::Nrpn);
        table.add("RPNM", BYTE, 1, MacroOp::RpnMsb);
        table.add("RPNL", BYTE, 1, MacroOp::RpnLsb);
        table.add("RPN", BYTE2, 2, MacroOp::Rpn);

        table.add("TEXT", TEXT, 1, MacroOp::MetaText(meta::TEXT));
        table.add("COPYRIGHT", TEXT, 1, MacroOp::MetaText(meta::COPYRIGHT));
        table.add("TRACKNAME", TEXT, 1, MacroOp::MetaText(meta::TRACK_NAME));
        table.add("INSTRUMENTNAME", TEXT, 1, MacroOp::MetaText(meta::INSTRUMENT_NAME));
        table.add("LYRIC", TEXT, 1, MacroOp::MetaText(meta::LYRIC));
        table.add("MARKER", TEXT, 1, MacroOp::MetaText(meta::MARKER));
        table.add("CUE", TEXT, 1, MacroOp::MetaText(meta::CUE));
        table.add("BEAT", BYTE2, 2, MacroOp::Beat);

        table.add("v", INT, 1, MacroOp::Velocity);
        table.add(")", NONE, 0, MacroOp::IncreaseVelocity);
        table.add("(", NONE, 0, MacroOp::DecreaseVelocity);
        table.add("l", LENGTH, 1, MacroOp::DefaultLength);
        table.add("TIMING", INT, 1, MacroOp::KeyDelay);
        table.add("GATE_DENOM", INT, 1, MacroOp::GateDenominator);
        table.add("Q", INT, 1, MacroOp::GateRelative);
        table.add("q", INT, 1, MacroOp::GateAbsolute);
        table.add("o", INT, 1, MacroOp::Octave);
        table.add(">", NONE, 0, MacroOp::IncreaseOctave);
        table.add("<", NONE, 0, MacroOp::DecreaseOctave);
        table.add("K", INT, 1, MacroOp::Transpose);

        for class in PitchClass::ALL {
            let letter = class.letter();
            for accidental in [Accidental::Sharp, Accidental::Flat, Accidental::Natural] {
                table.add(
                    format!("K{}{}", letter, accidental.suffix()),
                    NONE,
                    0,
                    MacroOp::KeySignature(class, accidental),
                );
            }
            for accidental in Accidental::ALL {
                table.add(
                    format!("{}{}", letter, accidental.suffix()),
                    PLAY,
                    0,
                    MacroOp::Play(class, accidental),
                );
            }
        }

        table.add("n", NOTE, 1, MacroOp::Note);
        table.add("r", INT, 1, MacroOp::Rest);
        table.add("[", NONE, 0, MacroOp::BeginLoop);
        table.add(":", VARIADIC, 0, MacroOp::BreakLoop);
        table.add("/", VARIADIC, 0, MacroOp::BreakLoop);
        table.add("]", INT, 1, MacroOp::EndLoop);
        table.add("GM_SYSTEM_ON", NONE, 0, MacroOp::GmSystemOn);
        table.add("XG_RESET", NONE, 0, MacroOp::XgReset);

        table
    }

    fn add(
        &mut self,
        name: impl Into<String>,
        params: &'static [ParamKind],
        required: usize,
        op: MacroOp,
    ) {
        let name = name.into();
        debug_assert!(!self.index.contains_key(&name), "duplicate macro {name}");
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(MacroDescriptor {
            name,
            params,
            required,
            op,
        });
    }

    pub fn lookup(&self, name: &str) -> Option<&MacroDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// All entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &MacroDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes every descriptor, for use by external compilers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Checks `args` against the macro's parameters and runs it.
    ///
    /// `Length` arguments are denominators; operations that work in ticks
    /// convert them with the controller's resolution.
    pub fn invoke<S: Sink>(
        &self,
        tc: &mut TrackController<S>,
        name: &str,
        args: &[MacroArg],
    ) -> Result<(), MacroError> {
        let desc = self
            .lookup(name)
            .ok_or_else(|| MacroError::Unknown(name.to_string()))?;
        desc.check(args)?;

        let a = Args(args);
        let res = tc.resolution();
        let ticks = |i: usize| -> Ticks { res.to_ticks(Length(a.int(i))) };

        match desc.op {
            MacroOp::Channel => tc.set_channel_natural(a.byte(0)),
            MacroOp::Debug => {
                if let Some(value) = args.first() {
                    tc.debug(value);
                }
            }
            MacroOp::AssertStep => {
                tc.assert_step(ticks(0), a.text(1));
            }
            MacroOp::ProgramWithBank => tc.program_with_bank(a.byte(0), a.byte(1), a.byte(2))?,
            MacroOp::Tempo => tc.set_tempo(a.int(0))?,
            MacroOp::BendCentMode => tc.set_bend_cent_mode(a.int(0)),
            MacroOp::Bend => tc.set_bend(a.int(0))?,
            MacroOp::PitchBendSensitivity => tc.pitch_bend_sensitivity(a.byte(0))?,
            MacroOp::SpectraSet(kind) => tc.spectra(kind).set(a.int(0))?,
            MacroOp::SpectraIncrease(kind) => tc.spectra(kind).increase(a.int(0))?,
            MacroOp::SpectraDecrease(kind) => tc.spectra(kind).decrease(a.int(0))?,
            MacroOp::SpectraOneShot(kind) => tc.spectra(kind).one_shot(
                a.int(0),
                a.int(1),
                ticks(2),
                ticks(3),
                a.int_or(4, OneShot::DEFAULT_STEP),
            )?,
            MacroOp::SpectraTriangle(kind) => tc.spectra(kind).triangle(Triangle {
                start: a.int(0),
                end: a.int(1),
                start_delay: ticks(2),
                end_duration: ticks(3),
                period: a.int(4),
                step: a.int(5),
                delta: a.int(6),
                repeats: a.int(7),
            })?,
            MacroOp::DataEntryMsb => tc.data_entry_msb(a.byte(0))?,
            MacroOp::DataEntryLsb => tc.data_entry_lsb(a.byte(0))?,
            MacroOp::DataEntry => tc.data_entry(a.byte(0), a.byte(1))?,
            MacroOp::Sostenuto => tc.sostenuto(a.byte(0))?,
            MacroOp::SoftPedal => tc.soft_pedal(a.byte(0))?,
            MacroOp::Legato => tc.legato(a.byte(0))?,
            MacroOp::NrpnMsb => tc.nrpn_msb(a.byte(0))?,
            MacroOp::NrpnLsb => tc.nrpn_lsb(a.byte(0))?,
            MacroOp::Nrpn => tc.nrpn(a.byte(0), a.byte(1))?,
            MacroOp::RpnMsb => tc.rpn_msb(a.byte(0))?,
            MacroOp::RpnLsb => tc.rpn_lsb(a.byte(0))?,
            MacroOp::Rpn => tc.rpn(a.byte(0), a.byte(1))?,
            MacroOp::MetaText(meta_type) => tc.meta_text(meta_type, a.text(0))?,
            MacroOp::Beat => tc.beat(a.byte(0), a.byte(1))?,
            MacroOp::Velocity => tc.state_mut().velocity = a.int(0),
            MacroOp::IncreaseVelocity => tc.increase_velocity(),
            MacroOp::DecreaseVelocity => tc.decrease_velocity(),
            MacroOp::DefaultLength => tc.state_mut().default_length = Length(a.int(0)),
            MacroOp::KeyDelay => tc.state_mut().key_delay = a.int(0),
            MacroOp::GateDenominator => tc.state_mut().gate_denominator = a.int(0),
            MacroOp::GateRelative => tc.state_mut().gate_relative = a.int(0),
            MacroOp::GateAbsolute => tc.state_mut().gate_absolute = a.int(0),
            MacroOp::Octave => tc.state_mut().octave = a.int(0),
            MacroOp::IncreaseOctave => tc.increase_octave(),
            MacroOp::DecreaseOctave => tc.decrease_octave(),
            MacroOp::Transpose => tc.state_mut().transpose = a.int(0),
            MacroOp::KeySignature(class, accidental) => tc.set_key_signature(class, accidental),
            MacroOp::Note => tc.note(
                a.byte(0),
                NoteOptions::from_sentinels(
                    a.int_or(1, -1),
                    a.int_or(2, -1),
                    a.int_or(3, -1),
                    a.int_or(4, -1),
                    a.int_or(5, 0) as u8,
                ),
            )?,
            MacroOp::Play(class, accidental) => tc.play(
                class,
                accidental,
                NoteOptions::from_sentinels(
                    a.int_or(0, -1),
                    a.int_or(1, -1),
                    a.int_or(2, -1),
                    a.int_or(3, -1),
                    a.int_or(4, 0) as u8,
                ),
            )?,
            MacroOp::Rest => tc.rest(a.int(0)),
            MacroOp::BeginLoop => tc.begin_loop()?,
            MacroOp::BreakLoop => {
                let targets: Vec<i32> = (0..args.len()).map(|i| a.int(i)).collect();
                tc.break_loop(&targets)?
            }
            MacroOp::EndLoop => tc.end_loop(a.int(0))?,
            MacroOp::GmSystemOn => tc.gm_system_on()?,
            MacroOp::XgReset => tc.xg_reset()?,
        }
        Ok(())
    }
}

/// Typed access to already-checked arguments.
struct Args<'a>(&'a [MacroArg]);

impl Args<'_> {
    fn int(&self, i: usize) -> i32 {
        self.int_or(i, 0)
    }

    fn int_or(&self, i: usize, default: i32) -> i32 {
        match self.0.get(i) {
            Some(MacroArg::Int(v)) => *v,
            _ => default,
        }
    }

    fn byte(&self, i: usize) -> u8 {
        self.int(i) as u8
    }

    fn text(&self, i: usize) -> &str {
        match self.0.get(i) {
            Some(MacroArg::Text(s)) => s,
            _ => "",
        }
    }
}

/// Splits `NAME arg arg ...` into a macro name and its arguments.
///
/// Arguments are separated by whitespace or commas. Double-quoted
/// arguments are text (with `\"` and `\\` escapes); anything else that
/// parses as an integer is a number, and the rest is text. Returns `None`
/// for a blank line.
pub fn parse_invocation(line: &str) -> Option<(String, Vec<MacroArg>)> {
    let mut tokens: Vec<(String, bool)> = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut text = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    other => text.push(other),
                }
            }
            tokens.push((text, true));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == ',' || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push((word, false));
        }
    }

    let mut tokens = tokens.into_iter();
    let (name, _) = tokens.next()?;
    let args = tokens
        .map(|(token, quoted)| match token.parse::<i32>() {
            Ok(v) if !quoted => MacroArg::Int(v),
            _ => MacroArg::Text(token),
        })
        .collect();
    Some((name, args))
}
