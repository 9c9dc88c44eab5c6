use super::{Quad, Vec2};

/// Axis-aligned rectangle (top-left origin, +Y down).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Rectangle of `size` centered on `center`.
    #[inline]
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            origin: center - size * 0.5,
            size,
        }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut r = self;
        if r.size.x < 0.0 {
            r.origin.x += r.size.x;
            r.size.x = -r.size.x;
        }
        if r.size.y < 0.0 {
            r.origin.y += r.size.y;
            r.size.y = -r.size.y;
        }
        r
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let a = self.normalized();
        let b = other.normalized();

        let x0 = a.origin.x.max(b.origin.x);
        let y0 = a.origin.y.max(b.origin.y);
        let x1 = a.max().x.min(b.max().x);
        let y1 = a.max().y.min(b.max().y);

        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            None
        } else {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Corners in quad order (top-left, top-right, bottom-left, bottom-right).
    #[inline]
    pub fn to_quad(self) -> Quad {
        let min = self.origin;
        let max = self.max();
        Quad::new(
            min,
            Vec2::new(max.x, min.y),
            Vec2::new(min.x, max.y),
            max,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_flips_negative_extents() {
        let n = Rect::new(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, Rect::new(6.0, 7.0, 4.0, 3.0));
    }

    #[test]
    fn centered_rect_has_requested_center() {
        let r = Rect::centered(Vec2::new(5.0, 5.0), Vec2::new(4.0, 2.0));
        assert_eq!(r.origin, Vec2::new(3.0, 4.0));
        assert_eq!(r.center(), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn intersect_overlap_and_touching_edge() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersect(Rect::new(5.0, 5.0, 10.0, 10.0)), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        // A shared edge has zero area.
        assert!(a.intersect(Rect::new(10.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn to_quad_orders_corners() {
        let q = Rect::new(1.0, 2.0, 3.0, 4.0).to_quad();
        assert_eq!(q.tl, Vec2::new(1.0, 2.0));
        assert_eq!(q.tr, Vec2::new(4.0, 2.0));
        assert_eq!(q.bl, Vec2::new(1.0, 6.0));
        assert_eq!(q.br, Vec2::new(4.0, 6.0));
    }
}
