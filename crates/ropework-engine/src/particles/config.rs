//! Emitter parameters, TOML loading and built-in presets.

use anyhow::{Context, Result, bail};
use bitflags::bitflags;

use crate::coords::Vec2;
use crate::paint::Color;

bitflags! {
    /// Optional per-particle behaviours layered on the base update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParticleFeatures: u8 {
        /// Spin each quad about its center.
        const ROTATE = 1 << 0;
        /// Interpolate size from `size` to `end_size` over the particle's life.
        const SCALE = 1 << 1;
    }
}

/// Spawn and simulation parameters for one [`ParticleSystem`](super::ParticleSystem).
///
/// Every `*_var` field is a symmetric variance: spawned values are
/// `base + var * r` with `r` uniform in `[-1, 1]`. Angles are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleConfig {
    pub max_particles: usize,

    pub source: Vec2,
    pub source_var: Vec2,

    pub angle: f32,
    pub angle_var: f32,
    pub speed: f32,
    pub speed_var: f32,

    pub radial_accel: f32,
    pub radial_accel_var: f32,
    pub tangential_accel: f32,
    pub tangential_accel_var: f32,
    pub gravity: Vec2,

    pub life: f32,
    pub life_var: f32,

    pub start_color: Color,
    pub start_color_var: Color,
    pub end_color: Color,
    pub end_color_var: Color,

    pub size: f32,
    pub size_var: f32,
    /// Target size for [`ParticleFeatures::SCALE`].
    pub end_size: f32,

    /// Initial spin for [`ParticleFeatures::ROTATE`].
    pub initial_angle: f32,
    /// Degrees per second.
    pub rotate_speed: f32,
    pub rotate_speed_var: f32,

    /// Particles per second. Zero disables continuous emission.
    pub emission_rate: f32,
    /// Seconds of emission; `None` emits until stopped.
    pub duration: Option<f32>,

    pub blend_additive: bool,
    pub features: ParticleFeatures,
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            max_particles: 256,
            source: Vec2::zero(),
            source_var: Vec2::zero(),
            angle: 0.0,
            angle_var: 0.0,
            speed: 0.0,
            speed_var: 0.0,
            radial_accel: 0.0,
            radial_accel_var: 0.0,
            tangential_accel: 0.0,
            tangential_accel_var: 0.0,
            gravity: Vec2::zero(),
            life: 1.0,
            life_var: 0.0,
            start_color: Color::WHITE,
            start_color_var: Color::TRANSPARENT,
            end_color: Color::WHITE,
            end_color_var: Color::TRANSPARENT,
            size: 1.0,
            size_var: 0.0,
            end_size: 1.0,
            initial_angle: 0.0,
            rotate_speed: 0.0,
            rotate_speed_var: 0.0,
            emission_rate: 10.0,
            duration: None,
            blend_additive: false,
            features: ParticleFeatures::empty(),
            seed: 0,
        }
    }
}

impl ParticleConfig {
    /// Star burst over the whole screen: two seconds of additive, spinning
    /// white specks thrown upwards and pulled back down.
    pub fn stars_break(screen: Vec2) -> Self {
        let half = screen / 2.0;
        Self {
            max_particles: 500,
            duration: Some(2.0),
            gravity: Vec2::new(0.0, 200.0),
            angle: -90.0,
            angle_var: 50.0,
            speed: 150.0,
            speed_var: 70.0,
            radial_accel: 0.0,
            radial_accel_var: 1.0,
            tangential_accel: 0.0,
            tangential_accel_var: 1.0,
            source: half,
            source_var: half,
            life: 4.0,
            life_var: 0.0,
            size: 1.0,
            size_var: 0.0,
            end_size: 1.0,
            emission_rate: 100.0,
            start_color: Color::WHITE,
            start_color_var: Color::TRANSPARENT,
            end_color: Color::WHITE,
            end_color_var: Color::TRANSPARENT,
            rotate_speed: 0.0,
            rotate_speed_var: 600.0,
            blend_additive: true,
            features: ParticleFeatures::ROTATE,
            ..Self::default()
        }
    }

    /// Parses a TOML document whose top-level keys are particle parameters.
    ///
    /// Missing keys keep their [`Default`] value. Vectors are `[x, y]` arrays,
    /// colors are `[r, g, b]` or `[r, g, b, a]`, `features` is a list of
    /// `"rotate"` / `"scale"`. Unknown keys are ignored.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let table: toml::Table = src.parse().context("particle config is not valid TOML")?;
        Self::from_toml(&table)
    }

    /// Applies the keys of an already parsed table over the defaults.
    pub fn from_toml(table: &toml::Table) -> Result<Self> {
        let mut config = Self::default();

        for (key, v) in table {
            match key.as_str() {
                "max_particles" => config.max_particles = toml_count(v).context(key.clone())?,
                "source" => config.source = toml_vec2(v).context(key.clone())?,
                "source_var" => config.source_var = toml_vec2(v).context(key.clone())?,
                "angle" => config.angle = toml_f32(v).context(key.clone())?,
                "angle_var" => config.angle_var = toml_f32(v).context(key.clone())?,
                "speed" => config.speed = toml_f32(v).context(key.clone())?,
                "speed_var" => config.speed_var = toml_f32(v).context(key.clone())?,
                "radial_accel" => config.radial_accel = toml_f32(v).context(key.clone())?,
                "radial_accel_var" => config.radial_accel_var = toml_f32(v).context(key.clone())?,
                "tangential_accel" => config.tangential_accel = toml_f32(v).context(key.clone())?,
                "tangential_accel_var" => {
                    config.tangential_accel_var = toml_f32(v).context(key.clone())?
                }
                "gravity" => config.gravity = toml_vec2(v).context(key.clone())?,
                "life" => config.life = toml_f32(v).context(key.clone())?,
                "life_var" => config.life_var = toml_f32(v).context(key.clone())?,
                "start_color" => config.start_color = toml_color(v, 1.0).context(key.clone())?,
                "start_color_var" => {
                    config.start_color_var = toml_color(v, 0.0).context(key.clone())?
                }
                "end_color" => config.end_color = toml_color(v, 1.0).context(key.clone())?,
                "end_color_var" => config.end_color_var = toml_color(v, 0.0).context(key.clone())?,
                "size" => config.size = toml_f32(v).context(key.clone())?,
                "size_var" => config.size_var = toml_f32(v).context(key.clone())?,
                "end_size" => config.end_size = toml_f32(v).context(key.clone())?,
                "initial_angle" => config.initial_angle = toml_f32(v).context(key.clone())?,
                "rotate_speed" => config.rotate_speed = toml_f32(v).context(key.clone())?,
                "rotate_speed_var" => config.rotate_speed_var = toml_f32(v).context(key.clone())?,
                "emission_rate" => config.emission_rate = toml_f32(v).context(key.clone())?,
                "duration" => {
                    let d = toml_f32(v).context(key.clone())?;
                    // Negative durations mean "forever".
                    config.duration = (d >= 0.0).then_some(d);
                }
                "blend_additive" => config.blend_additive = toml_bool(v).context(key.clone())?,
                "blend" => {
                    config.blend_additive = match v.as_str() {
                        Some("additive") => true,
                        Some("alpha") => false,
                        _ => bail!("blend: expected \"additive\" or \"alpha\", got {v}"),
                    }
                }
                "features" => config.features = toml_features(v).context(key.clone())?,
                "seed" => {
                    let seed = v.as_integer().with_context(|| format!("seed: expected integer, got {v}"))?;
                    config.seed = seed as u64;
                }
                other => log::debug!("particle config: ignoring unknown key `{other}`"),
            }
        }

        // A size without an end size keeps particles at a constant size.
        if table.contains_key("size") && !table.contains_key("end_size") {
            config.end_size = config.size;
        }
        Ok(config)
    }
}

fn toml_f32(v: &toml::Value) -> Result<f32> {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .with_context(|| format!("expected number, got {v}"))
}

fn toml_bool(v: &toml::Value) -> Result<bool> {
    v.as_bool().with_context(|| format!("expected boolean, got {v}"))
}

fn toml_count(v: &toml::Value) -> Result<usize> {
    let n = v.as_integer().with_context(|| format!("expected integer, got {v}"))?;
    usize::try_from(n).with_context(|| format!("expected a non-negative count, got {n}"))
}

fn toml_numbers(v: &toml::Value) -> Result<Vec<f32>> {
    let arr = v.as_array().with_context(|| format!("expected array, got {v}"))?;
    arr.iter().map(toml_f32).collect()
}

fn toml_vec2(v: &toml::Value) -> Result<Vec2> {
    match toml_numbers(v)?.as_slice() {
        [x, y] => Ok(Vec2::new(*x, *y)),
        other => bail!("expected [x, y], got {} components", other.len()),
    }
}

fn toml_color(v: &toml::Value, default_alpha: f32) -> Result<Color> {
    match toml_numbers(v)?.as_slice() {
        [r, g, b] => Ok(Color::new(*r, *g, *b, default_alpha)),
        [r, g, b, a] => Ok(Color::new(*r, *g, *b, *a)),
        other => bail!("expected [r, g, b] or [r, g, b, a], got {} components", other.len()),
    }
}

fn toml_features(v: &toml::Value) -> Result<ParticleFeatures> {
    let arr = v.as_array().with_context(|| format!("expected array of strings, got {v}"))?;
    let mut features = ParticleFeatures::empty();
    for item in arr {
        match item.as_str() {
            Some("rotate") => features |= ParticleFeatures::ROTATE,
            Some("scale") => features |= ParticleFeatures::SCALE,
            _ => bail!("unknown particle feature {item}"),
        }
    }
    Ok(features)
}
