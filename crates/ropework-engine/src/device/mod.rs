//! GPU device and window surface.
//!
//! [`Gpu`] owns the wgpu instance, adapter, device, queue and the configured
//! swapchain for one window. Drawing itself goes through
//! [`WgpuBackend`](crate::render::WgpuBackend), which shares the device and queue.

mod error;
mod frame;
mod gpu;
mod init;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
