/// Fixed-timestep accumulator.
///
/// Variable frame deltas go in, a whole number of constant simulation steps
/// comes out. The remainder carries over to the next frame so simulated time
/// never drifts from wall time. At most `max_steps` are produced per frame;
/// anything beyond that is dropped.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedStep {
    pub fn new(step: f32, max_steps: u32) -> Self {
        assert!(step > 0.0, "FixedStep requires a positive step");
        Self {
            step,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
        }
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Adds `dt` seconds and returns how many fixed steps to run now.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }

        if steps == self.max_steps && self.accumulator >= self.step {
            log::trace!("FixedStep: dropping {:.4}s of backlog", self.accumulator);
            self.accumulator %= self.step;
        }

        steps
    }

    /// Fraction of a step left in the accumulator, for render interpolation.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_partial_frames() {
        let mut fs = FixedStep::new(0.25, 8);
        assert_eq!(fs.advance(0.125), 0);
        assert_eq!(fs.advance(0.125), 1);
        assert_eq!(fs.advance(0.5), 2);
        assert_eq!(fs.alpha(), 0.0);
    }

    #[test]
    fn caps_steps_and_drops_backlog() {
        let mut fs = FixedStep::new(0.25, 2);
        assert_eq!(fs.advance(10.0), 2);
        assert!(fs.alpha() < 1.0);
        assert_eq!(fs.advance(0.0), 0);
    }
}
