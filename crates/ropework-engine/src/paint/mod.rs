//! Color model shared by materials, vertices and particles.
//!
//! Colors are stored straight-alpha so that linear per-channel interpolation
//! (particle fades) behaves predictably; the vertex packer converts to
//! whatever the active program expects.

pub mod color;

pub use color::Color;
