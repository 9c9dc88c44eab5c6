//! Chain of point masses held together by distance constraints.

use crate::coords::Vec2;
use crate::physics::point_mass::PointMass;

/// Largest integration substep for rope links, in seconds.
const MAX_STEP: f32 = 1.0 / 60.0;

#[derive(Debug, Clone)]
pub struct Rope {
    links: Vec<PointMass>,
    segment_length: f32,
    iterations: u32,
    pinned: bool,
}

impl Rope {
    /// Straight rope from `start` to `end` split into `segments` pieces.
    /// The first link is pinned in place.
    pub fn new(start: Vec2, end: Vec2, segments: usize, link_weight: f32) -> Self {
        let segments = segments.max(1);
        let step = (end - start) / segments as f32;
        let links = (0..=segments)
            .map(|i| {
                let mut pm = PointMass::at(start + step * i as f32);
                pm.set_weight(link_weight);
                pm
            })
            .collect();
        Self {
            links,
            segment_length: step.length(),
            iterations: 30,
            pinned: true,
        }
    }

    /// Constraint relaxation passes per update.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    #[inline]
    pub fn links(&self) -> &[PointMass] {
        &self.links
    }

    #[inline]
    pub fn segment_length(&self) -> f32 {
        self.segment_length
    }

    /// Moves the pinned end.
    pub fn set_anchor(&mut self, pos: Vec2) {
        if let Some(first) = self.links.first_mut() {
            first.pos = pos;
        }
    }

    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.links.iter().map(|l| l.pos)
    }

    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let free_from = usize::from(self.pinned);
        let before: Vec<Vec2> = self.links.iter().map(|l| l.pos).collect();

        for link in &mut self.links[free_from..] {
            link.update_with_precision(dt, MAX_STEP);
        }

        for _ in 0..self.iterations {
            self.relax();
        }

        // Constraint corrections feed back into velocity.
        for (link, prev) in self.links.iter_mut().zip(before).skip(free_from) {
            link.pos_delta = link.pos - prev;
            link.velocity = link.pos_delta / dt;
        }
    }

    fn relax(&mut self) {
        let rest = self.segment_length;
        for i in 0..self.links.len().saturating_sub(1) {
            let (a, b) = (self.links[i].pos, self.links[i + 1].pos);
            let delta = b - a;
            let dist = delta.length();
            if dist <= f32::EPSILON {
                continue;
            }
            let correction = delta * ((dist - rest) / dist);

            let a_fixed = i == 0 && self.pinned;
            if a_fixed {
                self.links[i + 1].pos -= correction;
            } else {
                self.links[i].pos += correction * 0.5;
                self.links[i + 1].pos -= correction * 0.5;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn anchor_stays_and_rope_hangs() {
        let mut rope = Rope::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 10, 0.1);
        for _ in 0..15 {
            rope.update(1.0 / 60.0);
        }
        let first = rope.links()[0].pos;
        let last = rope.links()[10].pos;
        assert_eq!(first, Vec2::zero());
        assert!(last.y > 5.0, "free end should swing down, got {last:?}");
        assert!(last.x < 100.0);
    }

    #[test]
    fn segments_stay_near_rest_length() {
        let mut rope = Rope::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 50.0), 5, 0.5);
        for _ in 0..30 {
            rope.update(1.0 / 60.0);
        }
        let pts: Vec<Vec2> = rope.points().collect();
        for w in pts.windows(2) {
            assert_abs_diff_eq!((w[1] - w[0]).length(), rope.segment_length(), epsilon = 0.5);
        }
    }

    #[test]
    fn unpinned_rope_falls_freely() {
        let mut rope = Rope::new(Vec2::new(0.0, 0.0), Vec2::new(40.0, 0.0), 4, 1.0);
        rope.set_pinned(false);
        rope.update(0.1);
        assert!(rope.links().iter().all(|l| l.pos.y > 0.0));
    }
}
