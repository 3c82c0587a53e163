//! Mutable tick position owned by a single controller.

use super::Ticks;

/// The current timeline position in ticks.
///
/// Plain integer arithmetic with no bound on sign or magnitude; overflow
/// wraps like a fixed-width counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineCursor {
    position: Ticks,
}

impl TimelineCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position in ticks.
    pub fn position(&self) -> Ticks {
        self.position
    }

    /// Moves forward by `ticks` (negative values move backward).
    pub fn advance(&mut self, ticks: Ticks) {
        self.position = self.position.wrapping_add(ticks);
    }

    /// Sets the absolute position.
    pub fn jump_to(&mut self, ticks: Ticks) {
        self.position = ticks;
    }

    /// Moves backward by `ticks`.
    pub fn rewind(&mut self, ticks: Ticks) {
        self.position = self.position.wrapping_sub(ticks);
    }
}
