//! Pitch resolution: pitch class + accidental + octave + transpose → key.
//!
//! Each of the seven pitch classes can be played four ways: with the
//! persistent key-signature accidental for that class (`Base`), or with a
//! fixed flat, natural or sharp. All four produce the same note emission and
//! differ only in where the accidental offset comes from.

use serde::{Deserialize, Serialize};

/// The seven natural pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl PitchClass {
    /// All pitch classes in table order.
    pub const ALL: [PitchClass; 7] = [
        PitchClass::C,
        PitchClass::D,
        PitchClass::E,
        PitchClass::F,
        PitchClass::G,
        PitchClass::A,
        PitchClass::B,
    ];

    /// Semitone offset of the natural note above C.
    pub fn base_offset(self) -> i32 {
        match self {
            PitchClass::C => 0,
            PitchClass::D => 2,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::G => 7,
            PitchClass::A => 9,
            PitchClass::B => 11,
        }
    }

    /// Position in the accidental table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lowercase macro letter for this pitch class.
    pub fn letter(self) -> char {
        match self {
            PitchClass::C => 'c',
            PitchClass::D => 'd',
            PitchClass::E => 'e',
            PitchClass::F => 'f',
            PitchClass::G => 'g',
            PitchClass::A => 'a',
            PitchClass::B => 'b',
        }
    }
}

/// Where a note's accidental offset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    /// Use the channel's key-signature table entry.
    Base,
    Flat,
    Natural,
    Sharp,
}

impl Accidental {
    pub const ALL: [Accidental; 4] = [
        Accidental::Base,
        Accidental::Flat,
        Accidental::Natural,
        Accidental::Sharp,
    ];

    /// Macro suffix used after the pitch letter.
    pub fn suffix(self) -> &'static str {
        match self {
            Accidental::Base => "",
            Accidental::Flat => "-",
            Accidental::Natural => "=",
            Accidental::Sharp => "+",
        }
    }

    /// Fixed semitone offset, or `None` for `Base`.
    pub fn fixed_offset(self) -> Option<i32> {
        match self {
            Accidental::Base => None,
            Accidental::Flat => Some(-1),
            Accidental::Natural => Some(0),
            Accidental::Sharp => Some(1),
        }
    }
}

/// Persistent per-pitch-class accidental offsets (the key signature).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccidentalTable([i32; 7]);

impl AccidentalTable {
    pub fn get(&self, class: PitchClass) -> i32 {
        self.0[class.index()]
    }

    pub fn set(&mut self, class: PitchClass, offset: i32) {
        self.0[class.index()] = offset;
    }

    /// Resets every entry to natural.
    pub fn clear(&mut self) {
        self.0 = [0; 7];
    }
}

/// Computes the absolute key number.
///
/// `octave * 12 + base offset + accidental offset + global transpose`.
/// The result is not range-checked; callers truncate to a byte at emission.
///
/// # Examples
///
/// ```
/// use mmlengine::pitch::{resolve_key, Accidental, AccidentalTable, PitchClass};
///
/// let table = AccidentalTable::default();
/// assert_eq!(resolve_key(PitchClass::C, Accidental::Base, 5, 0, &table), 60);
/// assert_eq!(resolve_key(PitchClass::A, Accidental::Sharp, 4, 0, &table), 58);
/// ```
pub fn resolve_key(
    class: PitchClass,
    accidental: Accidental,
    octave: i32,
    transpose: i32,
    table: &AccidentalTable,
) -> i32 {
    let accidental_offset = accidental
        .fixed_offset()
        .unwrap_or_else(|| table.get(class));
    octave
        .wrapping_mul(12)
        .wrapping_add(class.base_offset())
        .wrapping_add(accidental_offset)
        .wrapping_add(transpose)
}
