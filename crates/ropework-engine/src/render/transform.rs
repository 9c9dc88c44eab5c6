use crate::coords::Mat4;

/// Push/pop matrix stack for code written against immediate-mode transforms.
///
/// Operations post-multiply the current matrix, so the most recently applied
/// operation acts on vertices first (`glTranslate` semantics).
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    current: Mat4,
    stack: Vec<Mat4>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> Mat4 {
        self.current
    }

    /// Number of saved matrices.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self) {
        self.stack.push(self.current);
    }

    /// Restores the last pushed matrix; no-op on an empty stack.
    pub fn pop(&mut self) {
        if let Some(m) = self.stack.pop() {
            self.current = m;
        }
    }

    pub fn load_identity(&mut self) {
        self.current = Mat4::IDENTITY;
    }

    pub fn multiply(&mut self, m: Mat4) {
        self.current = self.current * m;
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(Mat4::translation(x, y, z));
    }

    /// Rotation about +Z, in degrees.
    pub fn rotate(&mut self, degrees: f32) {
        self.multiply(Mat4::rotation_z(degrees.to_radians()));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(Mat4::scale(x, y, z));
    }

    /// Drops every saved matrix and resets to identity.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.current = Mat4::IDENTITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use approx::assert_abs_diff_eq;

    #[test]
    fn push_pop_restores() {
        let mut ts = TransformStack::new();
        ts.translate(10.0, 0.0, 0.0);
        ts.push();
        ts.scale(2.0, 2.0, 1.0);
        assert_eq!(ts.depth(), 1);
        assert_eq!(ts.current().transform_point(Vec2::new(1.0, 1.0)), Vec2::new(12.0, 2.0));

        ts.pop();
        assert_eq!(ts.depth(), 0);
        assert_eq!(ts.current(), Mat4::translation(10.0, 0.0, 0.0));
    }

    #[test]
    fn pop_on_empty_is_a_no_op() {
        let mut ts = TransformStack::new();
        ts.translate(1.0, 2.0, 0.0);
        ts.pop();
        assert_eq!(ts.current(), Mat4::translation(1.0, 2.0, 0.0));
    }

    #[test]
    fn rotate_takes_degrees() {
        let mut ts = TransformStack::new();
        ts.rotate(90.0);
        let p = ts.current().transform_point(Vec2::new(1.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn clear_resets_everything() {
        let mut ts = TransformStack::new();
        ts.push();
        ts.push();
        ts.scale(3.0, 3.0, 1.0);
        ts.clear();
        assert_eq!(ts.depth(), 0);
        assert_eq!(ts.current(), Mat4::IDENTITY);
    }
}
