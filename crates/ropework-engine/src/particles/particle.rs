use crate::coords::Vec2;
use crate::paint::Color;

/// Simulation state of one live particle.
///
/// Geometry (quad, UVs, corner colors) lives in the owning system's
/// sprite batch at the same slot index.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub radial_accel: f32,
    pub tangential_accel: f32,

    pub color: Color,
    /// Color change per second.
    pub color_delta: Color,

    /// Seconds left. The slot is freed once this reaches zero.
    pub life: f32,

    pub size: f32,
    /// Size change per second (scaling systems only).
    pub size_delta: f32,
    /// Pixel size of the atlas frame; the drawn quad is `frame_size * size`.
    pub frame_size: Vec2,

    /// Radians.
    pub angle: f32,
    /// Radians per second.
    pub angular_velocity: f32,
}
