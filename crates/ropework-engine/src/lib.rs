//! Ropework engine crate.
//!
//! A 2D renderer that streams batched geometry into ring buffers, a pooled
//! particle simulation, a point-mass integrator and an adapter for
//! immediate-mode drawing code, plus the window/GPU runtime they run in.

pub mod core;
pub mod device;
pub mod time;
pub mod window;

pub mod coords;
pub mod legacy;
pub mod logging;
pub mod paint;
pub mod particles;
pub mod physics;
pub mod render;
