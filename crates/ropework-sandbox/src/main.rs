//! Interactive playground: a particle effect, a swinging rope and a scrolling camera.
//!
//! Usage: `ropework-sandbox [preset.toml]`. Without a preset the star burst plays.
//! Space restarts the effect, arrow keys pan the camera, Escape quits.

use anyhow::{Context, Result};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use ropework_engine::coords::Vec2;
use ropework_engine::core::{App, AppControl, FrameCtx};
use ropework_engine::device::GpuInit;
use ropework_engine::legacy::{GlBlendFactor, LegacyContext};
use ropework_engine::logging::{LoggingConfig, init_logging};
use ropework_engine::paint::Color;
use ropework_engine::particles::{ParticleConfig, ParticleSystem};
use ropework_engine::physics::Rope;
use ropework_engine::render::{
    Camera2D, CameraMode, RenderSink, Renderer, TextureAtlas, TextureId, Topology, TransformStack,
    WgpuBackend,
};
use ropework_engine::time::FixedStep;
use ropework_engine::window::{Runtime, RuntimeConfig};

const SCREEN: Vec2 = Vec2::new(960.0, 640.0);
const SIM_STEP: f32 = 1.0 / 120.0;
const SPARK_SIZE: u32 = 8;

struct Sandbox {
    renderer: Renderer<WgpuBackend>,
    config: ParticleConfig,
    particles: Option<ParticleSystem>,
    rope: Rope,
    camera: Camera2D,
    transforms: TransformStack,
    step: FixedStep,
    elapsed: f32,
    restart: bool,
}

impl Sandbox {
    fn new(config: ParticleConfig) -> Self {
        let anchor = Vec2::new(SCREEN.x * 0.5, 40.0);
        let mut camera = Camera2D::new(4.0, CameraMode::SpeedDelay);
        camera.move_to(0.0, 0.0, true);

        Self {
            renderer: Renderer::new(),
            config,
            particles: None,
            rope: Rope::new(anchor, anchor + Vec2::new(240.0, 0.0), 16, 1.0),
            camera,
            transforms: TransformStack::new(),
            step: FixedStep::new(SIM_STEP, 12),
            elapsed: 0.0,
            restart: false,
        }
    }

    fn simulate(&mut self, dt: f32) {
        for _ in 0..self.step.advance(dt) {
            self.elapsed += SIM_STEP;
            let sway = (self.elapsed * 0.8).sin() * 120.0;
            self.rope.set_anchor(Vec2::new(SCREEN.x * 0.5 + sway, 40.0));
            self.rope.update(SIM_STEP);

            if let Some(sys) = self.particles.as_mut() {
                if sys.update(SIM_STEP).is_some() {
                    log::info!("effect finished after {:.2}s", sys.elapsed());
                    self.restart = true;
                }
            }
        }
        self.camera.update(dt);

        if std::mem::take(&mut self.restart) {
            if let Some(sys) = self.particles.as_mut() {
                sys.start_system(0);
            }
        }
    }
}

impl App for Sandbox {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }
        let target = self.camera.target();
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
            PhysicalKey::Code(KeyCode::Space) => self.restart = true,
            PhysicalKey::Code(KeyCode::ArrowLeft) => self.camera.move_to(target.x - 100.0, target.y, false),
            PhysicalKey::Code(KeyCode::ArrowRight) => self.camera.move_to(target.x + 100.0, target.y, false),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.simulate(ctx.time.dt);

        let Self {
            renderer,
            config,
            particles,
            rope,
            camera,
            transforms,
            ..
        } = self;

        let control = ctx.render(renderer, Color::new(0.02, 0.02, 0.06, 1.0), |r| {
            if particles.is_none() {
                let texture = r.create_texture(SPARK_SIZE, SPARK_SIZE, &spark_pixels(SPARK_SIZE));
                let mut sys = ParticleSystem::new(config.clone(), spark_atlas(texture));
                sys.start_system(0);
                *particles = Some(sys);
            }

            camera.apply(transforms);
            if let Some(sys) = particles.as_mut() {
                sys.draw(r, transforms.current());
            }

            let points: Vec<Vec2> = rope.points().collect();
            let mut gl = LegacyContext::with_transforms(r, std::mem::take(transforms));
            gl.disable_texture();
            gl.blend_func(GlBlendFactor::SrcAlpha, GlBlendFactor::OneMinusSrcAlpha);
            gl.color4f(0.85, 0.7, 0.45, 1.0);
            gl.set_vertex_array(&points);
            gl.draw_arrays(Topology::LineStrip, 0, points.len());
            *transforms = gl.into_transforms();
            camera.cancel(transforms);
        });

        let stats = self.renderer.stats();
        log::trace!(
            "frame {}: {} draws, {} vertices",
            ctx.time.frame_index,
            stats.draw_calls,
            stats.vertices
        );
        control
    }
}

/// Soft round dot, white with alpha falling off towards the edge.
fn spark_pixels(size: u32) -> Vec<u8> {
    let c = (size as f32 - 1.0) * 0.5;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let d = Vec2::new(x as f32 - c, y as f32 - c).length() / (c + 0.5);
            let a = (1.0 - d).clamp(0.0, 1.0);
            rgba.extend_from_slice(&[255, 255, 255, (a * a * 255.0) as u8]);
        }
    }
    rgba
}

fn spark_atlas(texture: TextureId) -> TextureAtlas {
    TextureAtlas::single(texture, SPARK_SIZE as f32, SPARK_SIZE as f32)
}

fn load_config() -> Result<ParticleConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let src = std::fs::read_to_string(&path).with_context(|| format!("failed to read preset {path}"))?;
            ParticleConfig::from_toml_str(&src).with_context(|| format!("invalid preset {path}"))
        }
        None => Ok(ParticleConfig::stars_break(SCREEN)),
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = load_config()?;
    log::info!(
        "particle preset: {} max, {}/s, additive = {}",
        config.max_particles,
        config.emission_rate,
        config.blend_additive
    );

    Runtime::run(
        RuntimeConfig {
            title: "ropework sandbox".to_string(),
            initial_size: winit::dpi::LogicalSize::new(SCREEN.x as f64, SCREEN.y as f64),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        Sandbox::new(config),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ropework_engine::particles::ParticleFeatures;

    #[test]
    fn bundled_preset_parses() {
        let config = ParticleConfig::from_toml_str(include_str!("../presets/fountain.toml")).unwrap();
        assert_eq!(config.max_particles, 400);
        assert_eq!(config.duration, None);
        assert!(config.blend_additive);
        assert_eq!(config.features, ParticleFeatures::ROTATE | ParticleFeatures::SCALE);
    }

    #[test]
    fn spark_is_opaque_in_the_middle_and_clear_at_the_corner() {
        let px = spark_pixels(SPARK_SIZE);
        assert_eq!(px.len(), (SPARK_SIZE * SPARK_SIZE * 4) as usize);
        assert_eq!(px[3], 0);
        let mid = ((SPARK_SIZE / 2) * SPARK_SIZE + SPARK_SIZE / 2) as usize * 4;
        assert!(px[mid + 3] > 128);
    }
}
