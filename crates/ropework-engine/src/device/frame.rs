/// One acquired swapchain image.
///
/// Hold it only for the duration of a frame: the surface cannot hand out the
/// next image until this one is presented or dropped.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub width: u32,
    pub height: u32,
}

impl GpuFrame {
    /// Fresh view of the swapchain image, for attaching as a render target.
    pub fn view(&self) -> wgpu::TextureView {
        self.surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default())
    }
}
