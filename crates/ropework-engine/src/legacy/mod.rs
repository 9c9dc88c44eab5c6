//! Adapter for code written against fixed-function, immediate-mode drawing.
//!
//! A [`LegacyContext`] is created per frame around a [`RenderSink`](crate::render::RenderSink);
//! there is no global state. Its matrix stack can be carried between frames
//! with [`LegacyContext::into_transforms`].

mod blend;
mod context;

pub use blend::{GlBlendFactor, blend_mode_for};
pub use context::LegacyContext;
