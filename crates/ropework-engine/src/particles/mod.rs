//! Pooled particle emitters and their configuration.

pub mod config;
pub mod particle;
pub mod system;

pub use config::{ParticleConfig, ParticleFeatures};
pub use particle::Particle;
pub use system::{ParticleSystem, ParticlesFinished};
