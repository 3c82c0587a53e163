//! Note length ↔ tick conversion.
//!
//! Both directions compute `base_count / value` with 0 mapping to 0, so a
//! round trip is guaranteed only when the value divides `base_count`. Other
//! values may come back unchanged (5 → 38 → 5) or not (100 → 1 → 192); the
//! loss is accepted rather than corrected.

use super::Ticks;
use serde::{Deserialize, Serialize};

/// Ticks in a whole note unless configured otherwise.
pub const DEFAULT_BASE_COUNT: Ticks = 192;

/// A symbolic note length expressed as a denominator (4 = quarter note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(pub i32);

impl Length {
    pub const WHOLE: Length = Length(1);
    pub const QUARTER: Length = Length(4);

    /// Returns the raw denominator.
    pub fn denominator(self) -> i32 {
        self.0
    }
}

/// Tick resolution of a timeline: how many ticks make up a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resolution {
    base_count: Ticks,
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_COUNT)
    }
}

impl Resolution {
    /// Creates a resolution with `base_count` ticks per whole note.
    pub fn new(base_count: Ticks) -> Self {
        Self { base_count }
    }

    /// Ticks per whole note.
    pub fn base_count(&self) -> Ticks {
        self.base_count
    }

    /// Converts a symbolic length to ticks.
    ///
    /// # Examples
    ///
    /// ```
    /// use mmlengine::timeline::{Length, Resolution};
    ///
    /// let res = Resolution::default();
    /// assert_eq!(res.to_ticks(Length(4)), 48);
    /// assert_eq!(res.to_ticks(Length(0)), 0);
    /// ```
    pub fn to_ticks(&self, length: Length) -> Ticks {
        divide_or_zero(self.base_count, length.0)
    }

    /// Converts a tick count back to a symbolic length.
    ///
    /// Exact only for tick counts that divide the base count.
    pub fn from_ticks(&self, ticks: Ticks) -> Length {
        Length(divide_or_zero(self.base_count, ticks))
    }
}

fn divide_or_zero(base: i32, value: i32) -> i32 {
    if value == 0 {
        0
    } else {
        base.wrapping_div(value)
    }
}
