/// Device and surface settings used when a window's GPU context is created.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when the surface offers one.
    pub prefer_srgb: bool,

    /// Swap behaviour. `Fifo` paces the simulation to the display and is
    /// available everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Requested compositing mode; ignored when the surface does not support it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Adapter selection hint.
    pub power_preference: wgpu::PowerPreference,

    /// Limits requested from the device. `max_buffer_size` bounds how large a
    /// streaming vertex/index buffer may grow.
    pub required_limits: wgpu::Limits,

    /// Frames the CPU may queue ahead of presentation (hint only).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}
