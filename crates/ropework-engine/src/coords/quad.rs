use super::Vec2;

/// Four free corners of a quad.
///
/// Corner order is fixed across the engine: top-left, top-right, bottom-left,
/// bottom-right. The batcher triangulates this order as `(0,1,2)` and `(3,2,1)`.
/// Used both for positions and for texture coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Quad {
    pub tl: Vec2,
    pub tr: Vec2,
    pub bl: Vec2,
    pub br: Vec2,
}

impl Quad {
    #[inline]
    pub const fn new(tl: Vec2, tr: Vec2, bl: Vec2, br: Vec2) -> Self {
        Self { tl, tr, bl, br }
    }

    /// Corners as an array in canonical order.
    #[inline]
    pub fn corners(&self) -> [Vec2; 4] {
        [self.tl, self.tr, self.bl, self.br]
    }

    /// Rotates every corner about `center` by `angle` radians.
    pub fn rotated(&self, center: Vec2, angle: f32) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self {
            tl: self.tl.rotate_about(center, cos_a, sin_a),
            tr: self.tr.rotate_about(center, cos_a, sin_a),
            bl: self.bl.rotate_about(center, cos_a, sin_a),
            br: self.br.rotate_about(center, cos_a, sin_a),
        }
    }
}
