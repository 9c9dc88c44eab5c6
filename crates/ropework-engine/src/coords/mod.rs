//! Coordinate and geometry types shared across the renderer, particles and physics.
//!
//! Canonical CPU space:
//! - pixels, origin top-left
//! - +X right, +Y down
//!
//! Projection to clip space happens in shaders through the per-draw
//! `world * view * projection` matrix.

mod mat4;
mod quad;
mod rect;
mod vec2;
mod viewport;

pub use mat4::Mat4;
pub use quad::Quad;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
