//! Pooled particle emitter.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::coords::{Mat4, Quad, Rect, Vec2};
use crate::paint::Color;
use crate::particles::config::{ParticleConfig, ParticleFeatures};
use crate::particles::particle::Particle;
use crate::render::{Material, RenderSink, SpriteBatch, TextureAtlas};

/// Returned by [`ParticleSystem::update`] on the tick the last particle of a
/// stopped system dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticlesFinished;

/// Fixed-capacity pool of particles sharing one texture atlas.
///
/// Live particles occupy the dense prefix `[0, active_count)` of the pool and
/// of the sprite batch holding their geometry. A dying particle is replaced by
/// the last live one, so order is not preserved.
#[derive(Debug)]
pub struct ParticleSystem {
    config: ParticleConfig,
    atlas: TextureAtlas,
    particles: Vec<Particle>,
    sprites: SpriteBatch,
    rng: ChaCha8Rng,

    active: bool,
    elapsed: f32,
    emit_counter: f32,
    finish_pending: bool,
}

impl ParticleSystem {
    /// Creates an idle system. Nothing is emitted until [`start_system`](Self::start_system).
    pub fn new(config: ParticleConfig, atlas: TextureAtlas) -> Self {
        if atlas.is_empty() {
            log::warn!("particle system created with an empty atlas; particles will have no size");
        }
        let capacity = config.max_particles;
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            sprites: SpriteBatch::new(atlas.texture, capacity),
            particles: Vec::with_capacity(capacity),
            atlas,
            config,
            active: false,
            elapsed: 0.0,
            emit_counter: 0.0,
            finish_pending: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Moves the emitter. Already spawned particles stay where they are.
    pub fn set_source(&mut self, source: Vec2) {
        self.config.source = source;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.max_particles
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.particles.len() >= self.config.max_particles
    }

    /// Whether the emitter is still producing particles.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Position quads of live particles.
    #[inline]
    pub fn quads(&self) -> &[Quad] {
        &self.sprites.positions()[..self.particles.len()]
    }

    #[inline]
    pub fn uvs(&self) -> &[Quad] {
        &self.sprites.uvs()[..self.particles.len()]
    }

    /// Four corner colors per live particle.
    #[inline]
    pub fn colors(&self) -> &[Color] {
        let n = (self.particles.len() * 4).min(self.sprites.colors().len());
        &self.sprites.colors()[..n]
    }

    pub fn set_blend_additive(&mut self, additive: bool) {
        self.config.blend_additive = additive;
    }

    #[inline]
    pub fn blend_additive(&self) -> bool {
        self.config.blend_additive
    }

    /// Spawns one particle. Returns `false` if the pool is full.
    pub fn add_particle(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        let slot = self.particles.len();
        let c = &self.config;
        let rng = &mut self.rng;

        let (frame_size, uv) = if self.atlas.is_empty() {
            (Vec2::zero(), Quad::default())
        } else {
            let idx = rng.gen_range(0..self.atlas.len());
            let f = &self.atlas.frames[idx];
            (f.size, f.uv)
        };

        let pos = Vec2::new(
            c.source.x + c.source_var.x * spread(rng),
            c.source.y + c.source_var.y * spread(rng),
        );
        let angle = (c.angle + c.angle_var * spread(rng)).to_radians();
        let speed = c.speed + c.speed_var * spread(rng);
        let velocity = Vec2::new(angle.cos(), angle.sin()) * speed;

        let radial_accel = c.radial_accel + c.radial_accel_var * spread(rng);
        let tangential_accel = c.tangential_accel + c.tangential_accel_var * spread(rng);
        let life = c.life + c.life_var * spread(rng);

        let start = vary_color(rng, c.start_color, c.start_color_var);
        let end = vary_color(rng, c.end_color, c.end_color_var);
        let size = c.size + c.size_var * spread(rng);

        // Short-lived particles die on their first tick; no rate needed.
        let per_second = |delta: f32| if life > 0.0 { delta / life } else { 0.0 };

        let mut p = Particle {
            pos,
            velocity,
            radial_accel,
            tangential_accel,
            color: start,
            color_delta: Color::new(
                per_second(end.r - start.r),
                per_second(end.g - start.g),
                per_second(end.b - start.b),
                per_second(end.a - start.a),
            ),
            life,
            size,
            frame_size,
            ..Particle::default()
        };

        if c.features.contains(ParticleFeatures::ROTATE) {
            p.angle = c.initial_angle.to_radians();
            p.angular_velocity = (c.rotate_speed + c.rotate_speed_var * spread(rng)).to_radians();
        }
        if c.features.contains(ParticleFeatures::SCALE) {
            p.size_delta = per_second(c.end_size - size);
        }

        self.particles.push(p);
        self.sprites.set_quad_at(uv, Quad::default(), slot);
        self.write_geometry(slot);
        true
    }

    /// Clears the pool, spawns up to `initial_count` particles at once and
    /// (re)starts emission.
    pub fn start_system(&mut self, initial_count: usize) {
        self.particles.clear();
        self.elapsed = 0.0;
        self.emit_counter = 0.0;
        self.active = true;
        self.finish_pending = true;
        for _ in 0..initial_count {
            if !self.add_particle() {
                break;
            }
        }
        log::debug!(
            "particle system started with {} particles (capacity {})",
            self.particles.len(),
            self.capacity()
        );
    }

    /// Stops emission. Live particles keep simulating until they die.
    pub fn stop_system(&mut self) {
        self.active = false;
        if let Some(duration) = self.config.duration {
            self.elapsed = duration;
        }
        self.emit_counter = 0.0;
    }

    /// Restarts emission without touching live particles.
    pub fn reset_system(&mut self) {
        self.active = true;
        self.elapsed = 0.0;
        self.emit_counter = 0.0;
        self.finish_pending = true;
    }

    /// Advances emission and every live particle by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Option<ParticlesFinished> {
        if self.active && self.config.emission_rate > 0.0 {
            let interval = 1.0 / self.config.emission_rate;
            self.emit_counter += dt;
            while !self.is_full() && self.emit_counter >= interval {
                self.add_particle();
                self.emit_counter -= interval;
            }
            self.elapsed += dt;
            if self.config.duration.is_some_and(|d| self.elapsed >= d) {
                self.stop_system();
            }
        }

        let mut i = 0;
        while i < self.particles.len() {
            if self.particles[i].life <= 0.0 {
                self.kill(i);
                continue;
            }
            self.integrate(i, dt);
            if self.particles[i].life <= 0.0 {
                self.kill(i);
                continue;
            }
            i += 1;
        }

        if self.particles.is_empty() && !self.active && self.finish_pending {
            self.finish_pending = false;
            return Some(ParticlesFinished);
        }
        None
    }

    /// Draws every live particle in one batch.
    pub fn draw(&mut self, sink: &mut dyn RenderSink, world: Mat4) {
        let count = self.particles.len();
        if count == 0 {
            return;
        }
        let material = if self.config.blend_additive {
            Material::TEXTURED_VERTEX_COLOR_ADDITIVE
        } else {
            Material::TEXTURED_VERTEX_COLOR_ALPHA_BLEND
        };
        self.sprites.draw(sink, count, material, world);
    }

    fn integrate(&mut self, i: usize, dt: f32) {
        let gravity = self.config.gravity;
        let features = self.config.features;
        let p = &mut self.particles[i];

        let radial = p.pos.normalize_or_zero();
        let tangential = radial.perp();
        let accel = radial * p.radial_accel + tangential * p.tangential_accel + gravity;

        p.velocity += accel * dt;
        p.pos += p.velocity * dt;

        p.color += p.color_delta * dt;
        p.life -= dt;

        if features.contains(ParticleFeatures::ROTATE) {
            p.angle += p.angular_velocity * dt;
        }
        if features.contains(ParticleFeatures::SCALE) {
            p.size += p.size_delta * dt;
        }

        self.write_geometry(i);
    }

    fn write_geometry(&mut self, i: usize) {
        let p = &self.particles[i];
        let rect = Rect::centered(p.pos, p.frame_size * p.size);
        let mut quad = rect.to_quad();
        if self.config.features.contains(ParticleFeatures::ROTATE) {
            quad = quad.rotated(p.pos, p.angle);
        }
        let color = p.color.clamped();
        self.sprites.set_position_at(quad, i);
        self.sprites.set_colors_at([color; 4], i);
    }

    /// Swap-removes slot `i` from the pool and the sprite batch.
    fn kill(&mut self, i: usize) {
        self.particles.swap_remove(i);
        let last = self.particles.len();
        if i != last {
            self.sprites.copy_slot(last, i);
        }
    }
}

/// Uniform in `[-1, 1]`.
#[inline]
fn spread(rng: &mut ChaCha8Rng) -> f32 {
    rng.gen_range(-1.0f32..=1.0)
}

fn vary_color(rng: &mut ChaCha8Rng, base: Color, var: Color) -> Color {
    Color::new(
        base.r + var.r * spread(rng),
        base.g + var.g * spread(rng),
        base.b + var.b * spread(rng),
        base.a + var.a * spread(rng),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::RecordingBackend;
    use crate::render::command::{FrameContext, Topology};
    use crate::render::{BlendMode, Program, Renderer, TextureId};
    use approx::assert_abs_diff_eq;

    fn atlas() -> TextureAtlas {
        TextureAtlas::single(TextureId(3), 8.0, 8.0)
    }

    fn still_config() -> ParticleConfig {
        ParticleConfig {
            max_particles: 4,
            emission_rate: 2.0,
            duration: Some(2.0),
            life: 1.0,
            ..ParticleConfig::default()
        }
    }

    #[test]
    fn full_pool_rejects_spawns() {
        let mut sys = ParticleSystem::new(ParticleConfig { max_particles: 2, ..still_config() }, atlas());
        assert!(sys.add_particle());
        assert!(sys.add_particle());
        assert!(sys.is_full());
        assert!(!sys.add_particle());
        assert_eq!(sys.active_count(), 2);
    }

    #[test]
    fn start_system_spawns_at_most_capacity() {
        let mut sys = ParticleSystem::new(still_config(), atlas());
        sys.start_system(10);
        assert_eq!(sys.active_count(), 4);
        assert!(sys.is_active());
    }

    #[test]
    fn emission_lifecycle_is_deterministic() {
        let mut sys = ParticleSystem::new(still_config(), atlas());
        sys.start_system(0);

        let mut finished_at = Vec::new();
        let mut counts = Vec::new();
        for tick in 1..=30 {
            if sys.update(0.125).is_some() {
                finished_at.push(tick);
            }
            counts.push(sys.active_count());
            for p in sys.particles() {
                assert!(p.life > 0.0);
            }
        }

        // One spawn every 0.5 s for 2 s, each living exactly 1 s.
        assert_eq!(counts[3], 1);
        assert_eq!(counts[7], 2);
        assert_eq!(counts[10], 1);
        assert_eq!(counts[15], 2);
        assert_eq!(counts[21], 1);
        assert_eq!(counts[22], 0);
        assert!(!sys.is_active());
        assert_eq!(finished_at, vec![23]);
    }

    #[test]
    fn finished_is_rearmed_by_start() {
        let mut sys = ParticleSystem::new(
            ParticleConfig { emission_rate: 0.0, life: 0.5, ..still_config() },
            atlas(),
        );
        // A fresh system never reports.
        assert_eq!(sys.update(0.1), None);

        sys.start_system(1);
        sys.stop_system();
        assert_eq!(sys.update(0.25), None);
        assert_eq!(sys.update(0.25), Some(ParticlesFinished));
        assert_eq!(sys.update(0.25), None);

        sys.start_system(1);
        sys.stop_system();
        assert_eq!(sys.update(1.0), Some(ParticlesFinished));
    }

    #[test]
    fn stop_system_jumps_to_the_end_of_the_duration() {
        let mut sys = ParticleSystem::new(still_config(), atlas());
        sys.start_system(0);
        sys.update(0.25);
        sys.stop_system();
        assert_eq!(sys.elapsed(), 2.0);
        assert!(!sys.is_active());
    }

    #[test]
    fn same_seed_spawns_identical_particles() {
        let config = ParticleConfig {
            seed: 99,
            speed: 50.0,
            speed_var: 20.0,
            angle_var: 180.0,
            source_var: Vec2::new(100.0, 100.0),
            ..still_config()
        };
        let mut a = ParticleSystem::new(config.clone(), atlas());
        let mut b = ParticleSystem::new(config, atlas());
        a.start_system(4);
        b.start_system(4);
        assert_eq!(a.particles(), b.particles());
        assert_eq!(a.quads(), b.quads());
    }

    #[test]
    fn particle_under_gravity_uses_semi_implicit_euler() {
        let config = ParticleConfig {
            gravity: Vec2::new(0.0, 10.0),
            emission_rate: 0.0,
            life: 10.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);
        sys.update(0.5);
        let p = sys.particles()[0];
        assert_abs_diff_eq!(p.velocity.y, 5.0);
        assert_abs_diff_eq!(p.pos.y, 2.5);
        assert_abs_diff_eq!(p.life, 9.5);
    }

    #[test]
    fn radial_acceleration_is_zero_at_the_origin() {
        let config = ParticleConfig {
            radial_accel: 100.0,
            tangential_accel: 100.0,
            emission_rate: 0.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);
        sys.update(0.1);
        let p = sys.particles()[0];
        assert_eq!(p.velocity, Vec2::zero());
        assert!(p.pos.is_finite());
    }

    #[test]
    fn quad_is_frame_size_scaled_and_centered() {
        let config = ParticleConfig {
            source: Vec2::new(50.0, 40.0),
            size: 2.0,
            emission_rate: 0.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);
        assert_eq!(sys.quads()[0], Rect::new(42.0, 32.0, 16.0, 16.0).to_quad());
        assert_eq!(sys.uvs()[0], sys.atlas.frames[0].uv);
    }

    #[test]
    fn rotation_is_configured_in_degrees() {
        let config = ParticleConfig {
            initial_angle: 90.0,
            rotate_speed: 180.0,
            emission_rate: 0.0,
            features: ParticleFeatures::ROTATE,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);
        let p = sys.particles()[0];
        assert_abs_diff_eq!(p.angle, std::f32::consts::FRAC_PI_2);
        assert_abs_diff_eq!(p.angular_velocity, std::f32::consts::PI);

        sys.update(0.5);
        assert_abs_diff_eq!(sys.particles()[0].angle, std::f32::consts::PI, epsilon = 1e-5);
        // Rotated half a turn about its own center: top-left lands bottom-right.
        let q = sys.quads()[0];
        assert_abs_diff_eq!(q.tl.x, 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(q.tl.y, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn scaling_reaches_end_size_at_death() {
        let config = ParticleConfig {
            size: 1.0,
            end_size: 3.0,
            life: 1.0,
            emission_rate: 0.0,
            features: ParticleFeatures::SCALE,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);
        assert_abs_diff_eq!(sys.particles()[0].size_delta, 2.0);
        sys.update(0.5);
        assert_abs_diff_eq!(sys.particles()[0].size, 2.0);
    }

    #[test]
    fn colors_fade_towards_end_color() {
        let config = ParticleConfig {
            start_color: Color::new(1.0, 1.0, 1.0, 1.0),
            end_color: Color::new(1.0, 0.0, 0.0, 0.0),
            life: 2.0,
            emission_rate: 0.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);
        sys.update(1.0);
        let c = sys.colors()[0];
        assert_abs_diff_eq!(c.g, 0.5);
        assert_abs_diff_eq!(c.a, 0.5);
        assert_eq!(sys.colors().len(), 4);
    }

    #[test]
    fn spawned_life_stays_within_its_variance() {
        let config = ParticleConfig {
            max_particles: 150,
            life: 1.0,
            life_var: 0.25,
            seed: 7,
            emission_rate: 0.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(150);
        assert_eq!(sys.active_count(), 150);

        let lives: Vec<f32> = sys.particles().iter().map(|p| p.life).collect();
        assert!(lives.iter().all(|l| (0.75..=1.25).contains(l)));
        let lo = lives.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = lives.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(hi - lo > 0.25, "lives barely vary: {lo}..{hi}");
    }

    #[test]
    fn color_reaches_end_color_over_a_whole_life() {
        let end = Color::new(0.2, 0.4, 0.6, 0.0);
        let config = ParticleConfig {
            start_color: Color::WHITE,
            end_color: end,
            life: 1.0,
            emission_rate: 0.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(1);

        // Whatever is left of the life always lands exactly on the end color.
        for _ in 0..7 {
            sys.update(0.125);
            let p = sys.particles()[0];
            assert_abs_diff_eq!(p.color.r + p.color_delta.r * p.life, end.r, epsilon = 1e-5);
            assert_abs_diff_eq!(p.color.g + p.color_delta.g * p.life, end.g, epsilon = 1e-5);
            assert_abs_diff_eq!(p.color.b + p.color_delta.b * p.life, end.b, epsilon = 1e-5);
            assert_abs_diff_eq!(p.color.a + p.color_delta.a * p.life, end.a, epsilon = 1e-5);
        }

        let c = sys.colors()[0];
        assert_abs_diff_eq!(c.r, 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(c.g, 0.475, epsilon = 1e-5);
        assert_abs_diff_eq!(c.b, 0.65, epsilon = 1e-5);
        assert_abs_diff_eq!(c.a, 0.125, epsilon = 1e-5);

        sys.update(0.125);
        assert_eq!(sys.active_count(), 0);
    }

    #[test]
    fn reset_system_restarts_emission_and_keeps_live_particles() {
        let mut sys = ParticleSystem::new(still_config(), atlas());
        sys.start_system(2);
        sys.update(0.25);
        sys.stop_system();
        assert!(!sys.is_active());
        assert_eq!(sys.elapsed(), 2.0);

        sys.reset_system();
        assert!(sys.is_active());
        assert_eq!(sys.elapsed(), 0.0);
        assert_eq!(sys.active_count(), 2);

        // 2 per second: one new particle after half a second.
        sys.update(0.5);
        assert_eq!(sys.active_count(), 3);
        assert_abs_diff_eq!(sys.elapsed(), 0.5);
    }

    #[test]
    fn reset_system_rearms_finished() {
        let mut sys = ParticleSystem::new(ParticleConfig { emission_rate: 0.0, ..still_config() }, atlas());
        sys.start_system(1);
        sys.stop_system();
        assert_eq!(sys.update(2.0), Some(ParticlesFinished));
        assert_eq!(sys.update(0.1), None);

        sys.reset_system();
        sys.stop_system();
        assert_eq!(sys.update(0.1), Some(ParticlesFinished));
    }

    #[test]
    fn dying_slot_is_refilled_by_the_last_particle() {
        let config = ParticleConfig {
            emission_rate: 0.0,
            life: 1.0,
            life_var: 0.0,
            ..still_config()
        };
        let mut sys = ParticleSystem::new(config, atlas());
        sys.start_system(3);
        sys.particles[0].life = 0.0;
        sys.particles[2].pos = Vec2::new(77.0, 0.0);
        sys.update(0.0);

        assert_eq!(sys.active_count(), 2);
        assert_eq!(sys.particles()[0].pos, Vec2::new(77.0, 0.0));
        assert_eq!(sys.quads()[0], Rect::centered(Vec2::new(77.0, 0.0), Vec2::new(8.0, 8.0)).to_quad());
    }

    #[test]
    fn draw_goes_through_the_quad_path_with_additive_blending() {
        let mut r = Renderer::new();
        r.initialize(RecordingBackend::new());
        let mut sys = ParticleSystem::new(ParticleConfig { emission_rate: 0.0, ..still_config() }, atlas());
        sys.set_blend_additive(true);
        sys.start_system(3);

        r.begin_frame(FrameContext::screen(320.0, 240.0));
        sys.draw(&mut r, Mat4::IDENTITY);
        r.end_frame();

        let backend = r.backend().unwrap();
        let draws: Vec<_> = backend.draws().collect();
        assert_eq!(draws.len(), 1);
        let (state, call) = draws[0];
        assert_eq!(state.blend, BlendMode::Additive);
        assert_eq!(state.program, Program::TexturedVertexColor);
        assert_eq!(state.topology, Topology::TriangleList);
        assert_eq!(state.texture, Some(TextureId(3)));
        assert_eq!(call.indexed.map(|i| i.index_count), Some(18));
        assert_eq!(
            backend.indices_of(call),
            vec![0, 1, 2, 3, 2, 1, 4, 5, 6, 7, 6, 5, 8, 9, 10, 11, 10, 9]
        );
    }

    #[test]
    fn moved_source_applies_to_later_spawns() {
        let mut sys = ParticleSystem::new(ParticleConfig { emission_rate: 0.0, ..still_config() }, atlas());
        sys.start_system(1);
        sys.set_source(Vec2::new(40.0, -8.0));
        assert!(sys.add_particle());

        assert_eq!(sys.particles()[0].pos, Vec2::zero());
        assert_eq!(sys.particles()[1].pos, Vec2::new(40.0, -8.0));
        assert_eq!(sys.config().source, Vec2::new(40.0, -8.0));
    }

    #[test]
    fn empty_system_draws_nothing() {
        let mut r = Renderer::new();
        r.initialize(RecordingBackend::new());
        let mut sys = ParticleSystem::new(still_config(), atlas());
        r.begin_frame(FrameContext::default());
        sys.draw(&mut r, Mat4::IDENTITY);
        r.end_frame();
        assert_eq!(r.backend().unwrap().draws().count(), 0);
    }
}
