//! Time subsystem.
//!
//! - one `FrameClock` per render loop; `tick()` once per presented frame
//! - `FixedStep` turns frame deltas into constant simulation steps

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::{FrameClock, FrameTime};
