use crate::coords::Vec2;
use crate::render::transform::TransformStack;

/// How [`Camera2D`] approaches its target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CameraMode {
    /// Velocity proportional to the remaining distance at `move_to` time.
    SpeedDelay,
    /// Constant speed in pixels per second.
    SpeedPixels,
}

/// Scrolling camera that eases toward a target position.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2D {
    pub mode: CameraMode,
    pub speed: f32,
    pos: Vec2,
    target: Vec2,
    offset: Vec2,
}

impl Camera2D {
    pub fn new(speed: f32, mode: CameraMode) -> Self {
        Self {
            mode,
            speed,
            pos: Vec2::zero(),
            target: Vec2::zero(),
            offset: Vec2::zero(),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn move_to(&mut self, x: f32, y: f32, immediate: bool) {
        self.target = Vec2::new(x, y);
        if immediate {
            self.pos = self.target;
            return;
        }
        self.offset = match self.mode {
            CameraMode::SpeedDelay => (self.target - self.pos) * self.speed,
            CameraMode::SpeedPixels => (self.target - self.pos).normalize_or_zero() * self.speed,
        };
    }

    /// Steps toward the target, snapping to whole pixels and onto the
    /// target once it is passed.
    pub fn update(&mut self, dt: f32) {
        if self.pos == self.target {
            return;
        }
        let next = self.pos + self.offset * dt;
        self.pos = Vec2::new(next.x.round(), next.y.round());

        let remaining = self.target - self.pos;
        if !same_sign(self.offset.x, remaining.x) || !same_sign(self.offset.y, remaining.y) {
            self.pos = self.target;
        }
    }

    pub fn apply(&self, transforms: &mut TransformStack) {
        transforms.translate(-self.pos.x, -self.pos.y, 0.0);
    }

    pub fn cancel(&self, transforms: &mut TransformStack) {
        transforms.translate(self.pos.x, self.pos.y, 0.0);
    }
}

fn same_sign(a: f32, b: f32) -> bool {
    (a >= 0.0) == (b >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Mat4;

    #[test]
    fn immediate_move_jumps() {
        let mut cam = Camera2D::new(5.0, CameraMode::SpeedDelay);
        cam.move_to(100.0, 40.0, true);
        assert_eq!(cam.position(), Vec2::new(100.0, 40.0));
    }

    #[test]
    fn pixel_speed_moves_at_constant_rate() {
        let mut cam = Camera2D::new(100.0, CameraMode::SpeedPixels);
        cam.move_to(300.0, 0.0, false);
        cam.update(0.5);
        assert_eq!(cam.position(), Vec2::new(50.0, 0.0));
        cam.update(0.5);
        assert_eq!(cam.position(), Vec2::new(100.0, 0.0));
    }

    #[test]
    fn overshoot_snaps_to_target() {
        let mut cam = Camera2D::new(2.0, CameraMode::SpeedDelay);
        cam.move_to(10.0, 10.0, false);
        cam.update(1.0);
        assert_eq!(cam.position(), Vec2::new(10.0, 10.0));
        // Settled: further updates do nothing.
        cam.update(1.0);
        assert_eq!(cam.position(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn positions_are_whole_pixels() {
        let mut cam = Camera2D::new(0.5, CameraMode::SpeedDelay);
        cam.move_to(9.0, 0.0, false);
        cam.update(0.5);
        assert_eq!(cam.position(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn apply_and_cancel_are_inverse() {
        let mut cam = Camera2D::new(1.0, CameraMode::SpeedPixels);
        cam.move_to(30.0, 20.0, true);
        let mut ts = TransformStack::new();
        cam.apply(&mut ts);
        assert_eq!(ts.current().transform_point(Vec2::new(30.0, 20.0)), Vec2::zero());
        cam.cancel(&mut ts);
        assert_eq!(ts.current(), Mat4::IDENTITY);
    }
}
