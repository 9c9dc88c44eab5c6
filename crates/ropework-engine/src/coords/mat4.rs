use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

use super::Vec2;

/// Column-major 4×4 matrix, column vectors (`p' = M * p`).
///
/// Layout matches WGSL `mat4x4<f32>`, so the type uploads to uniforms as-is.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const fn translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    pub const fn scale(x: f32, y: f32, z: f32) -> Self {
        Self {
            cols: [
                [x, 0.0, 0.0, 0.0],
                [0.0, y, 0.0, 0.0],
                [0.0, 0.0, z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rotation about +Z by `radians` (counter-clockwise in a +Y-up frame,
    /// clockwise on screen when +Y points down).
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Off-center orthographic projection mapping the box to clip space
    /// (x, y in [-1, 1], z in [0, 1]).
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;
        Self {
            cols: [
                [2.0 / rl, 0.0, 0.0, 0.0],
                [0.0, 2.0 / tb, 0.0, 0.0],
                [0.0, 0.0, -1.0 / fnr, 0.0],
                [-(right + left) / rl, -(top + bottom) / tb, -near / fnr, 1.0],
            ],
        }
    }

    /// Pixel-space projection: origin top-left, +Y down, `width × height` pixels.
    pub fn screen_projection(width: f32, height: f32) -> Self {
        Self::orthographic(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
    }

    /// Transforms a point on the z = 0 plane.
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let c = &self.cols;
        Vec2::new(
            c[0][0] * p.x + c[1][0] * p.y + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[3][1],
        )
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (col, out_col) in out.iter_mut().enumerate() {
            for (row, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][row] * rhs.cols[col][k]).sum();
            }
        }
        Mat4 { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_is_neutral() {
        let t = Mat4::translation(3.0, 4.0, 0.0);
        assert_eq!(Mat4::IDENTITY * t, t);
        assert_eq!(t * Mat4::IDENTITY, t);
    }

    #[test]
    fn product_applies_right_operand_first() {
        // T * S: scale first, then translate.
        let m = Mat4::translation(10.0, 0.0, 0.0) * Mat4::scale(2.0, 2.0, 1.0);
        assert_eq!(m.transform_point(Vec2::new(1.0, 1.0)), Vec2::new(12.0, 2.0));
    }

    #[test]
    fn rotation_quarter_turn() {
        let p = Mat4::rotation_z(std::f32::consts::FRAC_PI_2).transform_point(Vec2::new(1.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn screen_projection_maps_corners_to_clip_space() {
        let m = Mat4::screen_projection(800.0, 600.0);
        let tl = m.transform_point(Vec2::new(0.0, 0.0));
        let br = m.transform_point(Vec2::new(800.0, 600.0));
        assert_abs_diff_eq!(tl.x, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tl.y, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(br.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(br.y, -1.0, epsilon = 1e-6);
    }
}
