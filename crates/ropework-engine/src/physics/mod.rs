//! Physics primitives: a point-mass integrator and constraint chains built on it.

pub mod point_mass;
pub mod rope;

pub use point_mass::{GRAVITY_CONSTANT, MAX_FORCES, MAX_SUBSTEPS, PointMass, global_gravity, set_global_gravity};
pub use rope::Rope;
