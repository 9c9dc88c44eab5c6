//! Window and event loop.
//!
//! Owns the `winit` event loop and windows, creates a [`Gpu`](crate::device::Gpu)
//! per window and drives [`App`](crate::core::App) callbacks.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
