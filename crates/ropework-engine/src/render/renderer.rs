//! Draw submission.
//!
//! [`Renderer`] is the single funnel for quad, mesh and particle draws: it
//! streams geometry into ring buffers, resolves the material into a program
//! plus blend/sampler state, hands the draw to its [`GpuBackend`] and keeps
//! per-frame [`RenderStats`].

use crate::coords::{Mat4, Quad, Rect, Viewport};
use crate::paint::Color;
use crate::render::backend::{BufferKind, DrawCall, DrawState, DrawUniforms, GpuBackend, IndexedDraw};
use crate::render::command::{BufferRange, DrawCommand, FrameContext, IndexSource, Topology, VertexSource};
use crate::render::error::RenderError;
use crate::render::material::{Material, Program};
use crate::render::quad_batch::{MAX_QUADS_PER_BATCH, QuadBatchRenderer, QuadBatcher};
use crate::render::stats::RenderStats;
use crate::render::streaming::StreamingBuffer;
use crate::render::texture::TextureId;
use crate::render::vertex::Vertex;

/// Anything draw producers (particles, sprite batches, the legacy adapter)
/// can render into.
pub trait RenderSink {
    fn begin_frame(&mut self, frame: FrameContext);
    fn update_view_projection(&mut self, view: Mat4, projection: Mat4);
    /// `target == None` selects the presentation surface.
    fn set_viewport(&mut self, viewport: Option<Viewport>, target: Option<TextureId>);
    fn set_scissor(&mut self, scissor: Option<Rect>);
    fn clear(&mut self, color: Color);
    fn submit(&mut self, cmd: &DrawCommand<'_>);
    fn end_frame(&mut self);
    fn stats(&self) -> RenderStats;

    /// Direct quad path, when the sink has one.
    fn as_quad_batcher(&mut self) -> Option<&mut dyn QuadBatchRenderer> {
        None
    }

    fn draw_quad(&mut self, texture: Option<TextureId>, vertices: &[Vertex], material: Material, world: Mat4) {
        self.submit(&DrawCommand::quad(texture, vertices, material, world));
    }

    fn draw_mesh(
        &mut self,
        texture: Option<TextureId>,
        vertices: &[Vertex],
        indices: Option<&[u16]>,
        topology: Topology,
        material: Material,
        world: Mat4,
    ) {
        self.submit(&DrawCommand::mesh(texture, vertices, indices, topology, material, world));
    }

    fn draw_particles(
        &mut self,
        texture: TextureId,
        vertices: &[Vertex],
        indices: &[u16],
        material: Material,
        world: Mat4,
    ) {
        self.submit(&DrawCommand::particles(texture, vertices, indices, material, world));
    }
}

pub struct Renderer<B: GpuBackend> {
    backend: Option<B>,
    vertices: StreamingBuffer<Vertex>,
    indices: StreamingBuffer<u16>,
    batcher: QuadBatcher,
    frame: FrameContext,
    in_frame: bool,
    stats: RenderStats,
    warned_missing_texture: bool,
    warned_outside_frame: bool,
}

impl<B: GpuBackend> Renderer<B> {
    pub fn new() -> Self {
        Self {
            backend: None,
            vertices: StreamingBuffer::new(BufferKind::Vertex),
            indices: StreamingBuffer::new(BufferKind::Index),
            batcher: QuadBatcher::new(),
            frame: FrameContext::default(),
            in_frame: false,
            stats: RenderStats::default(),
            warned_missing_texture: false,
            warned_outside_frame: false,
        }
    }

    /// Binds the device. Buffers are created lazily on first upload.
    pub fn initialize(&mut self, backend: B) {
        if self.backend.is_some() {
            log::warn!("Renderer::initialize called twice; replacing backend");
            self.vertices = StreamingBuffer::new(BufferKind::Vertex);
            self.indices = StreamingBuffer::new(BufferKind::Index);
        }
        self.backend = Some(backend);
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    #[inline]
    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        self.device("create_texture").create_texture(width, height, rgba)
    }

    pub fn create_render_target(&mut self, width: u32, height: u32) -> TextureId {
        self.device("create_render_target").create_render_target(width, height)
    }

    /// Streams vertices for later use through [`VertexSource::Buffer`].
    pub fn upload_vertices(&mut self, data: &[Vertex]) -> Result<BufferRange, RenderError> {
        let Some(backend) = self.backend.as_mut() else {
            panic!("Renderer::upload_vertices called before Renderer::initialize");
        };
        self.vertices.upload(backend, data)
    }

    /// Streams indices for later use through [`IndexSource::Buffer`].
    pub fn upload_indices(&mut self, data: &[u16]) -> Result<BufferRange, RenderError> {
        let Some(backend) = self.backend.as_mut() else {
            panic!("Renderer::upload_indices called before Renderer::initialize");
        };
        self.indices.upload(backend, data)
    }

    fn device(&mut self, op: &str) -> &mut B {
        match self.backend.as_mut() {
            Some(b) => b,
            None => panic!("Renderer::{op} called before Renderer::initialize"),
        }
    }

    fn draw_state(&self, cmd: &DrawCommand<'_>, texture: Option<TextureId>) -> DrawState {
        let premultiply = if cmd.material.blend.premultiplies() { 1.0 } else { 0.0 };
        DrawState {
            program: Program::select(&cmd.material),
            blend: cmd.material.blend,
            sampler: cmd.material.sampler,
            topology: cmd.topology,
            texture,
            uniforms: DrawUniforms {
                mvp: self.frame.projection * self.frame.view * cmd.world,
                diffuse: cmd.material.diffuse().to_array(),
                flags: [premultiply, 0.0, 0.0, 0.0],
            },
            target: self.frame.render_target,
            viewport: self.frame.viewport,
            scissor: self.frame.scissor,
        }
    }
}

impl<B: GpuBackend> Default for Renderer<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Uploads whatever the command carries inline and resolves buffer ranges.
fn stage_geometry<B: GpuBackend>(
    backend: &mut B,
    vertices: &mut StreamingBuffer<Vertex>,
    indices: &mut StreamingBuffer<u16>,
    cmd: &DrawCommand<'_>,
) -> Result<DrawCall, RenderError> {
    let (vertex_buffer, vrange) = match cmd.vertices {
        VertexSource::Slice(data) => {
            let range = vertices.upload(backend, data)?;
            (vertices.resolve(&range)?, range)
        }
        VertexSource::Buffer(range) => (vertices.resolve(&range)?, range),
    };

    let indexed = match cmd.indices {
        None => None,
        Some(IndexSource::Slice(data)) => {
            let range = indices.upload(backend, data)?;
            Some((indices.resolve(&range)?, range))
        }
        Some(IndexSource::Buffer(range)) => Some((indices.resolve(&range)?, range)),
    };

    Ok(DrawCall {
        vertex_buffer,
        first_vertex: vrange.offset,
        vertex_count: vrange.count,
        indexed: indexed.map(|(buffer, range)| IndexedDraw {
            buffer,
            first_index: range.offset,
            index_count: range.count,
        }),
    })
}

impl<B: GpuBackend> RenderSink for Renderer<B> {
    fn begin_frame(&mut self, frame: FrameContext) {
        self.device("begin_frame").begin_frame();
        self.frame = frame;
        self.stats = RenderStats::default();
        self.in_frame = true;
    }

    fn update_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.frame.view = view;
        self.frame.projection = projection;
    }

    fn set_viewport(&mut self, viewport: Option<Viewport>, target: Option<TextureId>) {
        self.frame.viewport = viewport;
        self.frame.render_target = target;
    }

    fn set_scissor(&mut self, scissor: Option<Rect>) {
        self.frame.scissor = scissor;
    }

    fn clear(&mut self, color: Color) {
        let target = self.frame.render_target;
        self.device("clear").clear(target, color);
    }

    fn submit(&mut self, cmd: &DrawCommand<'_>) {
        if self.backend.is_none() {
            panic!("Renderer::submit called before Renderer::initialize");
        }
        if cmd.vertices.is_empty() || cmd.indices.as_ref().is_some_and(IndexSource::is_empty) {
            return;
        }

        let texture = match (cmd.material.use_texture, cmd.texture) {
            (true, None) => {
                if !self.warned_missing_texture {
                    log::warn!("skipping textured draw without a texture");
                    self.warned_missing_texture = true;
                }
                return;
            }
            (true, Some(t)) => Some(t),
            (false, _) => None,
        };

        if !self.in_frame && !self.warned_outside_frame {
            log::debug!("draw submitted outside begin_frame/end_frame");
            self.warned_outside_frame = true;
        }

        let state = self.draw_state(cmd, texture);
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let call = match stage_geometry(backend, &mut self.vertices, &mut self.indices, cmd) {
            Ok(call) => call,
            Err(err) => {
                log::error!("draw dropped: {err}");
                return;
            }
        };

        if !backend.draw(&state, &call) {
            return;
        }
        self.stats.state_changes += 1;
        self.stats.record_draw(call.vertex_count, call.indexed.map_or(0, |ix| ix.index_count));
    }

    fn end_frame(&mut self) {
        self.device("end_frame").end_frame();
        self.in_frame = false;
        log::trace!(
            "frame stats: {} draws, {} state changes, {} vertices, {} indices",
            self.stats.draw_calls,
            self.stats.state_changes,
            self.stats.vertices,
            self.stats.indices
        );
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }

    fn as_quad_batcher(&mut self) -> Option<&mut dyn QuadBatchRenderer> {
        Some(self)
    }
}

impl<B: GpuBackend> QuadBatchRenderer for Renderer<B> {
    fn draw_textured_quads(
        &mut self,
        texture: TextureId,
        positions: &[Quad],
        uvs: &[Quad],
        colors: Option<&[Color]>,
        quad_count: usize,
        material: Material,
        world: Mat4,
    ) {
        if self.backend.is_none() {
            panic!("Renderer::draw_textured_quads called before Renderer::initialize");
        }
        if quad_count == 0 || positions.len() < quad_count || uvs.len() < quad_count {
            return;
        }
        // Decide once for the whole request so split batches agree.
        let colors = colors.filter(|c| c.len() >= quad_count * 4);

        let mut batcher = std::mem::take(&mut self.batcher);
        let mut start = 0;
        while start < quad_count {
            let n = (quad_count - start).min(MAX_QUADS_PER_BATCH);
            let chunk_colors = colors.map(|c| &c[start * 4..]);
            if let Some(batch) =
                batcher.build_for(&positions[start..], &uvs[start..], chunk_colors, n, &material)
            {
                self.submit(&DrawCommand::particles(texture, batch.vertices, batch.indices, material, world));
            }
            start += n;
        }
        self.batcher = batcher;
    }
}
