use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::paint::Color;
use crate::render::{FrameContext, RenderSink, Renderer, WgpuBackend};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Window size in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let logical: winit::dpi::LogicalSize<f64> =
            self.window.inner_size().to_logical(self.window.scale_factor());
        (logical.width as f32, logical.height as f32)
    }
}

/// Per-frame context handed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` spans the callback; `'w` is the window borrow held by [`Gpu`].
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Acquires the swapchain image, clears it and runs `draw` between the
    /// renderer's `begin_frame` and `end_frame`, then presents.
    ///
    /// The projection maps logical pixels with a top-left origin. The renderer
    /// is initialized with a backend for this window on first use.
    pub fn render<F>(&mut self, renderer: &mut Renderer<WgpuBackend>, clear: Color, draw: F) -> AppControl
    where
        F: FnOnce(&mut Renderer<WgpuBackend>),
    {
        if !renderer.is_initialized() {
            renderer.initialize(self.gpu.create_backend());
        }

        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("surface lost beyond recovery; exiting");
                        AppControl::Exit
                    }
                    _ => AppControl::Continue,
                };
            }
        };

        if let Some(backend) = renderer.backend_mut() {
            backend.set_surface_target(frame.view(), frame.width, frame.height);
        }

        let (w, h) = self.window.logical_size();
        renderer.begin_frame(FrameContext::screen(w, h));
        renderer.clear(clear);
        draw(renderer);
        renderer.end_frame();

        if let Some(backend) = renderer.backend_mut() {
            backend.clear_surface_target();
        }

        self.window.window.pre_present_notify();
        self.gpu.present(frame);
        AppControl::Continue
    }
}
