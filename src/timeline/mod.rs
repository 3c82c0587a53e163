//! Timeline primitives: symbolic lengths, tick conversion and the cursor.
//!
//! A whole note is `BaseCount` ticks (192 by default). Lengths are written
//! as denominators (4 = quarter note) and must be converted to ticks
//! explicitly through [`Resolution::to_ticks`]; there is no implicit
//! conversion in either direction.

mod cursor;
mod length;

pub use cursor::TimelineCursor;
pub use length::{Length, Resolution, DEFAULT_BASE_COUNT};

/// Timeline position or displacement in ticks.
pub type Ticks = i32;
