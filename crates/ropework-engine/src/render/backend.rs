//! Device seam.
//!
//! `Renderer` talks to the GPU only through [`GpuBackend`]. The wgpu
//! implementation lives in `wgpu_backend`; [`RecordingBackend`] keeps every
//! call in memory so draw paths can be checked without a device.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::coords::{Mat4, Rect, Viewport};
use crate::paint::Color;
use crate::render::command::Topology;
use crate::render::material::{BlendMode, Program, SamplerMode};
use crate::render::texture::TextureId;
use crate::render::vertex::Vertex;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// How a write relates to data the GPU may still be reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteHint {
    /// Previous contents are dead; in-flight readers must keep seeing the old data.
    Discard,
    /// The written range is untouched by any pending draw.
    NoOverwrite,
}

/// Per-draw uniform block. Layout mirrors `DrawUniforms` in `shaders/sprite.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// projection * view * world
    pub mvp: Mat4,
    pub diffuse: [f32; 4],
    /// x: premultiply colors before blending (1.0 / 0.0).
    pub flags: [f32; 4],
}

/// Everything a backend needs to configure the pipeline for one draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawState {
    pub program: Program,
    pub blend: BlendMode,
    pub sampler: SamplerMode,
    pub topology: Topology,
    pub texture: Option<TextureId>,
    pub uniforms: DrawUniforms,
    pub target: Option<TextureId>,
    pub viewport: Option<Viewport>,
    pub scissor: Option<Rect>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndexedDraw {
    pub buffer: BufferId,
    pub first_index: u32,
    pub index_count: u32,
}

/// Buffer ranges for one draw. Indices are relative to `first_vertex`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub vertex_buffer: BufferId,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub indexed: Option<IndexedDraw>,
}

pub trait GpuBackend {
    /// Largest buffer the device can allocate, in bytes.
    fn max_buffer_bytes(&self) -> u64;

    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> BufferId;
    fn destroy_buffer(&mut self, id: BufferId);

    /// `offset_bytes` and the buffer size are multiples of 4; `data` may not be.
    fn write_buffer(&mut self, id: BufferId, offset_bytes: u64, data: &[u8], hint: WriteHint);

    /// RGBA8 texture, `rgba.len() == width * height * 4`.
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureId;
    /// Texture usable both as a render target and as a sampled texture.
    fn create_render_target(&mut self, width: u32, height: u32) -> TextureId;

    fn begin_frame(&mut self);
    fn clear(&mut self, target: Option<TextureId>, color: Color);
    /// Queues one draw. Returns `false` when the backend dropped it, e.g. a
    /// missing target or a fully clipped scissor.
    fn draw(&mut self, state: &DrawState, call: &DrawCall) -> bool;
    fn end_frame(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CreateBuffer { id: BufferId, kind: BufferKind, size_bytes: u64 },
    DestroyBuffer(BufferId),
    Write { id: BufferId, offset_bytes: u64, len: usize, hint: WriteHint },
    CreateTexture { id: TextureId, width: u32, height: u32, render_target: bool },
    BeginFrame,
    Clear { target: Option<TextureId>, color: Color },
    Draw { state: DrawState, call: DrawCall },
    EndFrame,
}

/// Headless backend that records calls and mirrors buffer contents in memory.
#[derive(Debug)]
pub struct RecordingBackend {
    max_buffer_bytes: u64,
    next_buffer: u32,
    next_texture: u32,
    buffers: HashMap<BufferId, Vec<u8>>,
    events: Vec<BackendEvent>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_max_buffer_bytes(256 << 20)
    }

    pub fn with_max_buffer_bytes(max_buffer_bytes: u64) -> Self {
        Self {
            max_buffer_bytes,
            next_buffer: 0,
            next_texture: 0,
            buffers: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn draws(&self) -> impl Iterator<Item = (&DrawState, &DrawCall)> {
        self.events.iter().filter_map(|e| match e {
            BackendEvent::Draw { state, call } => Some((state, call)),
            _ => None,
        })
    }

    pub fn writes(&self) -> impl Iterator<Item = (BufferId, u64, usize, WriteHint)> + '_ {
        self.events.iter().filter_map(|e| match *e {
            BackendEvent::Write { id, offset_bytes, len, hint } => Some((id, offset_bytes, len, hint)),
            _ => None,
        })
    }

    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    /// Vertices a recorded draw would read.
    pub fn vertices_of(&self, call: &DrawCall) -> Vec<Vertex> {
        let stride = std::mem::size_of::<Vertex>();
        let start = call.first_vertex as usize * stride;
        let end = start + call.vertex_count as usize * stride;
        self.buffers
            .get(&call.vertex_buffer)
            .map(|bytes| bytemuck::pod_collect_to_vec(&bytes[start..end]))
            .unwrap_or_default()
    }

    /// Indices a recorded draw would read, still relative to `first_vertex`.
    pub fn indices_of(&self, call: &DrawCall) -> Vec<u16> {
        let Some(ix) = call.indexed else {
            return Vec::new();
        };
        let start = ix.first_index as usize * 2;
        let end = start + ix.index_count as usize * 2;
        self.buffers
            .get(&ix.buffer)
            .map(|bytes| bytemuck::pod_collect_to_vec(&bytes[start..end]))
            .unwrap_or_default()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for RecordingBackend {
    fn max_buffer_bytes(&self) -> u64 {
        self.max_buffer_bytes
    }

    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, vec![0; size_bytes as usize]);
        self.events.push(BackendEvent::CreateBuffer { id, kind, size_bytes });
        id
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id);
        self.events.push(BackendEvent::DestroyBuffer(id));
    }

    fn write_buffer(&mut self, id: BufferId, offset_bytes: u64, data: &[u8], hint: WriteHint) {
        if let Some(buf) = self.buffers.get_mut(&id) {
            let start = offset_bytes as usize;
            buf[start..start + data.len()].copy_from_slice(data);
        }
        self.events.push(BackendEvent::Write { id, offset_bytes, len: data.len(), hint });
    }

    fn create_texture(&mut self, width: u32, height: u32, _rgba: &[u8]) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.events.push(BackendEvent::CreateTexture { id, width, height, render_target: false });
        id
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.events.push(BackendEvent::CreateTexture { id, width, height, render_target: true });
        id
    }

    fn begin_frame(&mut self) {
        self.events.push(BackendEvent::BeginFrame);
    }

    fn clear(&mut self, target: Option<TextureId>, color: Color) {
        self.events.push(BackendEvent::Clear { target, color });
    }

    fn draw(&mut self, state: &DrawState, call: &DrawCall) -> bool {
        if state.scissor.is_some_and(|r| r.normalized().is_empty()) {
            return false;
        }
        self.events.push(BackendEvent::Draw { state: *state, call: *call });
        true
    }

    fn end_frame(&mut self) {
        self.events.push(BackendEvent::EndFrame);
    }
}
