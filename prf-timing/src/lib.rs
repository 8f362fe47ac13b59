pub mod intervals;
pub mod simulated;
pub mod timer;

pub use intervals::{FrameIntervals, FrameTimingStats};
pub use simulated::{ManualClock, SteppedClock};
pub use timer::{Clock, HighPrecisionTimer};
