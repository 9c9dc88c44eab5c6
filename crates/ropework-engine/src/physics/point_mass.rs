//! Point-mass force integrator shared by particles, ropes and other bodies.

use std::cell::Cell;

use crate::coords::Vec2;

/// Upper bound on substeps taken by [`PointMass::update_with_precision`].
pub const MAX_SUBSTEPS: u32 = 1024;

/// Number of force slots per point mass.
pub const MAX_FORCES: usize = 10;

/// Downward acceleration in pixels/s² at weight 1.
pub const GRAVITY_CONSTANT: f32 = 784.0;

thread_local! {
    static GLOBAL_GRAVITY: Cell<Vec2> = const { Cell::new(Vec2::zero()) };
}

/// Overrides per-body gravity for every [`PointMass`] updated on this thread.
/// A zero vector restores per-body gravity.
pub fn set_global_gravity(g: Vec2) {
    GLOBAL_GRAVITY.with(|cell| cell.set(g));
}

pub fn global_gravity() -> Vec2 {
    GLOBAL_GRAVITY.with(Cell::get)
}

/// A weighted point integrated with semi-implicit Euler.
///
/// Forces live in sparse slots; only `0..=highest_force_index` is summed.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMass {
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Velocity change applied by the last update.
    pub acceleration: Vec2,
    /// Position change applied by the last update.
    pub pos_delta: Vec2,
    /// Summed forces divided by weight, i.e. the acceleration of the last update.
    pub total_accel: Vec2,
    pub disable_gravity: bool,
    weight: f32,
    inv_weight: f32,
    gravity: Vec2,
    forces: [Vec2; MAX_FORCES],
    highest_force_index: Option<usize>,
}

impl PointMass {
    pub fn new() -> Self {
        let mut pm = Self {
            pos: Vec2::zero(),
            velocity: Vec2::zero(),
            acceleration: Vec2::zero(),
            pos_delta: Vec2::zero(),
            total_accel: Vec2::zero(),
            disable_gravity: false,
            weight: 1.0,
            inv_weight: 1.0,
            gravity: Vec2::zero(),
            forces: [Vec2::zero(); MAX_FORCES],
            highest_force_index: None,
        };
        pm.set_weight(1.0);
        pm
    }

    pub fn at(pos: Vec2) -> Self {
        Self { pos, ..Self::new() }
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    pub fn inv_weight(&self) -> f32 {
        self.inv_weight
    }

    /// Per-body gravity force, `(0, GRAVITY_CONSTANT * weight)`.
    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
        self.inv_weight = 1.0 / weight;
        self.gravity = Vec2::new(0.0, GRAVITY_CONSTANT * weight);
    }

    #[inline]
    pub fn highest_force_index(&self) -> Option<usize> {
        self.highest_force_index
    }

    /// # Panics
    /// If `id >= MAX_FORCES`.
    pub fn set_force(&mut self, id: usize, force: Vec2) {
        self.forces[id] = force;
        if self.highest_force_index.is_none_or(|h| id > h) {
            self.highest_force_index = Some(id);
        }
    }

    /// Zeroes slot `id`; the summation bound is left as is.
    pub fn delete_force(&mut self, id: usize) {
        self.forces[id] = Vec2::zero();
    }

    pub fn force(&self, id: usize) -> Vec2 {
        self.forces[id]
    }

    pub fn reset_forces(&mut self) {
        self.forces = [Vec2::zero(); MAX_FORCES];
        self.highest_force_index = None;
    }

    /// Clears forces and all kinematic state. Weight and gravity settings stay.
    pub fn reset_all(&mut self) {
        self.reset_forces();
        self.pos = Vec2::zero();
        self.velocity = Vec2::zero();
        self.acceleration = Vec2::zero();
        self.pos_delta = Vec2::zero();
        self.total_accel = Vec2::zero();
    }

    /// One semi-implicit Euler step: velocity first, then position.
    pub fn update(&mut self, dt: f32) {
        let mut total = Vec2::zero();
        if !self.disable_gravity {
            let global = global_gravity();
            total += if global.is_zero() { self.gravity } else { global * self.weight };
        }
        if let Some(highest) = self.highest_force_index {
            for f in &self.forces[..=highest] {
                total += *f;
            }
        }

        self.total_accel = total * self.inv_weight;
        self.acceleration = self.total_accel * dt;
        self.velocity += self.acceleration;
        self.pos_delta = self.velocity * dt;
        self.pos += self.pos_delta;
    }

    /// Splits `dt` into `floor(dt / max_step) + 1` equal substeps, at most
    /// [`MAX_SUBSTEPS`]. A non-positive or non-finite `max_step` takes one step.
    pub fn update_with_precision(&mut self, dt: f32, max_step: f32) {
        let steps = substeps(dt, max_step);
        let step = dt / steps as f32;
        for _ in 0..steps {
            self.update(step);
        }
    }

    /// Displaces the point by `impulse * dt`; zero impulses are ignored.
    pub fn apply_impulse(&mut self, impulse: Vec2, dt: f32) {
        if !impulse.is_zero() {
            self.pos += impulse * dt;
        }
    }
}

impl Default for PointMass {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn substeps(dt: f32, max_step: f32) -> u32 {
    if !(max_step > 0.0 && max_step.is_finite()) {
        return 1;
    }
    let n = (dt / max_step).max(0.0);
    if !n.is_finite() {
        return 1;
    }
    (n as u32).saturating_add(1).min(MAX_SUBSTEPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn free_fall_uses_semi_implicit_euler() {
        let mut pm = PointMass::new();
        pm.update(0.5);
        // v = 784 * 0.5, p = v * 0.5
        assert_relative_eq!(pm.velocity.y, 392.0);
        assert_relative_eq!(pm.pos.y, 196.0);
        assert_relative_eq!(pm.pos_delta.y, 196.0);
    }

    #[test]
    fn weight_scales_gravity_but_not_fall_rate() {
        let mut pm = PointMass::new();
        pm.set_weight(4.0);
        assert_eq!(pm.gravity(), Vec2::new(0.0, 3136.0));
        assert_relative_eq!(pm.inv_weight(), 0.25);
        pm.update(1.0);
        assert_relative_eq!(pm.velocity.y, 784.0);
    }

    #[test]
    fn forces_are_summed_up_to_highest_slot() {
        let mut pm = PointMass::new();
        pm.disable_gravity = true;
        pm.set_force(3, Vec2::new(10.0, 0.0));
        pm.set_force(1, Vec2::new(0.0, 5.0));
        assert_eq!(pm.highest_force_index(), Some(3));

        pm.update(1.0);
        assert_eq!(pm.velocity, Vec2::new(10.0, 5.0));

        pm.delete_force(3);
        assert_eq!(pm.highest_force_index(), Some(3));
        assert_eq!(pm.force(3), Vec2::zero());

        pm.reset_forces();
        assert_eq!(pm.highest_force_index(), None);
    }

    #[test]
    #[should_panic]
    fn out_of_range_force_slot_panics() {
        PointMass::new().set_force(MAX_FORCES, Vec2::zero());
    }

    #[test]
    fn global_gravity_overrides_instance_gravity() {
        set_global_gravity(Vec2::new(-100.0, 0.0));
        let mut pm = PointMass::new();
        pm.set_weight(2.0);
        pm.update(1.0);
        set_global_gravity(Vec2::zero());

        assert_eq!(pm.total_accel, Vec2::new(-100.0, 0.0));
        assert_relative_eq!(pm.velocity.x, -100.0);
        assert_relative_eq!(pm.velocity.y, 0.0);
    }

    #[test]
    fn disabled_gravity_ignores_global_too() {
        set_global_gravity(Vec2::new(0.0, 50.0));
        let mut pm = PointMass::new();
        pm.disable_gravity = true;
        pm.update(1.0);
        set_global_gravity(Vec2::zero());
        assert_eq!(pm.velocity, Vec2::zero());
    }

    #[test]
    fn precision_update_runs_n_substeps() {
        assert_eq!(substeps(0.1, 0.03), 4);
        assert_eq!(substeps(0.01, 0.03), 1);

        let mut fine = PointMass::new();
        fine.update_with_precision(0.1, 0.03);
        let mut manual = PointMass::new();
        for _ in 0..4 {
            manual.update(0.025);
        }
        assert_relative_eq!(fine.pos.y, manual.pos.y, epsilon = 1e-4);
        assert_relative_eq!(fine.velocity.y, 78.4, epsilon = 1e-3);
    }

    #[test]
    fn degenerate_precision_takes_a_single_step() {
        assert_eq!(substeps(0.1, 0.0), 1);
        assert_eq!(substeps(0.1, -0.5), 1);
        assert_eq!(substeps(0.1, f32::NAN), 1);
        assert_eq!(substeps(0.1, f32::INFINITY), 1);
        assert_eq!(substeps(f32::INFINITY, 0.01), 1);
        assert_eq!(substeps(0.1, 1e-12), MAX_SUBSTEPS);

        let mut pm = PointMass::new();
        pm.update_with_precision(0.1, 0.0);
        let mut single = PointMass::new();
        single.update(0.1);
        assert_eq!(pm, single);
        assert_relative_eq!(pm.velocity.y, 78.4, epsilon = 1e-4);
    }

    #[test]
    fn tiny_precision_is_capped() {
        let mut pm = PointMass::new();
        pm.update_with_precision(1.0, 1e-9);
        // Capped substeps still integrate the whole interval.
        assert_relative_eq!(pm.velocity.y, 784.0, epsilon = 1e-2);
    }

    #[test]
    fn impulse_moves_position_only() {
        let mut pm = PointMass::new();
        pm.apply_impulse(Vec2::new(10.0, 0.0), 0.5);
        assert_eq!(pm.pos, Vec2::new(5.0, 0.0));
        assert_eq!(pm.velocity, Vec2::zero());

        pm.apply_impulse(Vec2::zero(), 1.0);
        assert_eq!(pm.pos, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn reset_all_keeps_weight() {
        let mut pm = PointMass::at(Vec2::new(1.0, 2.0));
        pm.set_weight(3.0);
        pm.set_force(0, Vec2::new(1.0, 1.0));
        pm.update(0.1);
        pm.reset_all();
        assert_eq!(pm.pos, Vec2::zero());
        assert_eq!(pm.highest_force_index(), None);
        assert_relative_eq!(pm.weight(), 3.0);
    }
}
