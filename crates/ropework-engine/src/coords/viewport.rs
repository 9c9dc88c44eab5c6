/// Viewport in physical pixels of the current render target.
///
/// `x`/`y` give the top-left corner; a default viewport (all zero) means
/// "the full target".
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    #[inline]
    pub const fn with_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}
