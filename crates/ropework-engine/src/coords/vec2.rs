use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// 2D vector in logical pixels (or pixels per second, for velocities).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn dot(self, rhs: Vec2) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// The zero vector maps to itself; no division takes place in that case.
    #[inline]
    pub fn normalize_or_zero(self) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        let len = self.length();
        if len > 0.0 { self / len } else { Self::zero() }
    }

    /// Counter-clockwise 90° rotation: `(x, y) -> (-y, x)`.
    #[inline]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Rotates `self` about `center` using precomputed `cos`/`sin` of the angle.
    #[inline]
    pub fn rotate_about(self, center: Vec2, cos_a: f32, sin_a: f32) -> Self {
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self::new(
            dx * cos_a - dy * sin_a + center.x,
            dx * sin_a + dy * cos_a + center.y,
        )
    }

    /// Component-wise product.
    #[inline]
    pub fn scale(self, rhs: Vec2) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalize_zero_stays_zero() {
        let n = Vec2::zero().normalize_or_zero();
        assert_eq!(n, Vec2::zero());
        assert!(n.is_finite());
    }

    #[test]
    fn normalize_has_unit_length() {
        let n = Vec2::new(3.0, 4.0).normalize_or_zero();
        assert_abs_diff_eq!(n.length(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(n.x, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn perp_is_counter_clockwise() {
        assert_eq!(Vec2::new(1.0, 0.0).perp(), Vec2::new(0.0, 1.0));
        assert_eq!(Vec2::new(0.0, 1.0).perp(), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn rotate_about_center_quarter_turn() {
        let half_pi = std::f32::consts::FRAC_PI_2;
        let p = Vec2::new(2.0, 1.0).rotate_about(Vec2::new(1.0, 1.0), half_pi.cos(), half_pi.sin());
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-6);
    }
}
