mod timer;

pub use timer::{FrameTimingStats, HighPrecisionTimer, ManualTimer, Timer, nanos_to_millis};
