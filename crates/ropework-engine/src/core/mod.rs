//! Contract between the window runtime and game code.
//!
//! The runtime owns the event loop, window and GPU; games implement [`App`]
//! and receive a [`FrameCtx`] once per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
