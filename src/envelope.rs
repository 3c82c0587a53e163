//! Stepped envelopes over the timeline.
//!
//! A spectral envelope approximates a continuous parameter sweep (pitch
//! bend, volume, ...) as a series of discrete values. Each value is pushed
//! to the target immediately, interleaved with cursor advances, so the sink
//! receives the events at the right tick positions.
//!
//! Both generators finish by advancing the cursor by the position they
//! started from. That is a displacement, not a restore: the cursor ends up
//! `saved` ticks further than where the last step left it. Downstream output
//! depends on this, so it is kept as is. When the target fails part way,
//! the cursor goes back to where the envelope started instead.

use crate::error::SinkResult;
use crate::timeline::Ticks;

/// Something an envelope can drive: a cursor plus a value with a setter.
pub trait EnvelopeTarget {
    /// Current timeline position.
    fn position(&self) -> Ticks;

    /// Moves the timeline cursor forward by `ticks`.
    fn advance(&mut self, ticks: Ticks);

    /// Last value pushed through [`set_value`](Self::set_value).
    fn value(&self) -> i32;

    /// Stores the value and emits it.
    fn set_value(&mut self, value: i32) -> SinkResult;
}

/// Sweep from `start` to `end` in steps of `step` ticks over `length` ticks.
///
/// Each step adds `(end - start) / (i + 1)` (integer division, truncating
/// toward zero) to the running value, which gives a harmonic decay curve
/// rather than a linear ramp. The last value is snapped to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneShot {
    pub start: i32,
    pub end: i32,
    pub start_delay: Ticks,
    pub length: Ticks,
    pub step: Ticks,
}

impl OneShot {
    /// Step size used when none is given.
    pub const DEFAULT_STEP: Ticks = 4;

    pub fn new(start: i32, end: i32, start_delay: Ticks, length: Ticks) -> Self {
        Self {
            start,
            end,
            start_delay,
            length,
            step: Self::DEFAULT_STEP,
        }
    }

    /// Number of intermediate steps (zero when `step` is zero).
    pub fn repeats(&self) -> i32 {
        if self.step == 0 {
            0
        } else {
            self.length.wrapping_div(self.step)
        }
    }

    /// Runs the sweep against `target`.
    pub fn run<T: EnvelopeTarget + ?Sized>(&self, target: &mut T) -> SinkResult {
        let saved = target.position();
        let result = self.sweep(target);
        finish(target, saved, result)
    }

    fn sweep<T: EnvelopeTarget + ?Sized>(&self, target: &mut T) -> SinkResult {
        target.advance(self.start_delay);
        target.set_value(self.start)?;

        let span = self.end.wrapping_sub(self.start);
        for i in 0..self.repeats() {
            target.advance(self.step);
            let next = target.value().wrapping_add(span / (i + 1));
            target.set_value(next)?;
        }

        target.set_value(self.end)
    }
}

/// Oscillate around `start` by `delta` per `step`, then settle at `end`.
///
/// Each repeat rises for `period / step` steps and falls for as many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub start: i32,
    pub end: i32,
    pub start_delay: Ticks,
    pub end_duration: Ticks,
    /// Ticks spent rising (and again falling) per repeat.
    pub period: Ticks,
    pub step: Ticks,
    pub delta: i32,
    pub repeats: i32,
}

impl Triangle {
    /// Steps per half wave (zero when `step` is zero).
    pub fn half_wave_steps(&self) -> i32 {
        if self.step == 0 {
            0
        } else {
            self.period.wrapping_div(self.step)
        }
    }

    /// Runs the oscillation against `target`.
    pub fn run<T: EnvelopeTarget + ?Sized>(&self, target: &mut T) -> SinkResult {
        let saved = target.position();
        let result = self.oscillate(target);
        finish(target, saved, result)
    }

    fn oscillate<T: EnvelopeTarget + ?Sized>(&self, target: &mut T) -> SinkResult {
        target.advance(self.start_delay);
        target.set_value(self.start)?;

        let half = self.half_wave_steps();
        for _ in 0..self.repeats {
            for _ in 0..half {
                target.advance(self.step);
                let next = target.value().wrapping_add(self.delta);
                target.set_value(next)?;
            }
            for _ in 0..half {
                target.advance(self.step);
                let next = target.value().wrapping_sub(self.delta);
                target.set_value(next)?;
            }
        }

        target.advance(self.end_duration);
        target.set_value(self.end)
    }
}

/// Applies the closing displacement, or puts the cursor back at `saved`
/// when the sink failed part way.
fn finish<T: EnvelopeTarget + ?Sized>(
    target: &mut T,
    saved: Ticks,
    result: SinkResult,
) -> SinkResult {
    match result {
        Ok(()) => {
            target.advance(saved);
            Ok(())
        }
        Err(err) => {
            let moved = target.position().wrapping_sub(saved);
            target.advance(moved.wrapping_neg());
            Err(err)
        }
    }
}
