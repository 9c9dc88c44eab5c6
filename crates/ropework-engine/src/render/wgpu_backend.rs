//! wgpu implementation of [`GpuBackend`].
//!
//! Draws are recorded into a pending pass and encoded lazily. A pass ends
//! when the target changes, on `end_frame`, or when a `Discard` write (or a
//! uniform ring wrap) would clobber data that recorded draws still read; in
//! that last case the pending work is submitted first so the queue applies
//! the new write after those draws.

use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::coords::{Rect, Viewport};
use crate::paint::Color;
use crate::render::backend::{
    BufferId, BufferKind, DrawCall, DrawState, DrawUniforms, GpuBackend, WriteHint,
};
use crate::render::command::Topology;
use crate::render::material::{BlendMode, Program, SamplerMode};
use crate::render::streaming::RingCursor;
use crate::render::texture::TextureId;
use crate::render::vertex::Vertex;

/// Draw uniforms held per submission before the ring wraps.
const UNIFORM_SLOTS: u32 = 1024;

/// Format of sampled (non render-target) textures.
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: Program,
    blend: BlendMode,
    topology: Topology,
    format: wgpu::TextureFormat,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    render_target: bool,
}

struct SurfaceTarget {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct RecordedDraw {
    pipeline: PipelineKey,
    textures: (TextureId, SamplerMode),
    uniform_offset: u32,
    viewport: [f32; 4],
    scissor: [u32; 4],
    call: DrawCall,
}

struct PendingPass {
    target: Option<TextureId>,
    clear: Option<Color>,
    draws: Vec<RecordedDraw>,
}

impl PendingPass {
    fn new(target: Option<TextureId>) -> Self {
        Self { target, clear: None, draws: Vec::new() }
    }
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    surface: Option<SurfaceTarget>,

    shader: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: HashMap<SamplerMode, wgpu::Sampler>,

    buffers: HashMap<BufferId, wgpu::Buffer>,
    next_buffer: u32,
    textures: HashMap<TextureId, GpuTexture>,
    texture_groups: HashMap<(TextureId, SamplerMode), wgpu::BindGroup>,
    next_texture: u32,
    white: TextureId,

    uniforms: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    uniform_ring: RingCursor,
    uniform_stride: u64,

    pass: Option<PendingPass>,
    encoder: Option<wgpu::CommandEncoder>,
    pad: Vec<u8>,
    warned_no_target: bool,
}

impl WgpuBackend {
    /// `surface_format` is the presentation format; render targets share it
    /// so one pipeline set serves both.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ropework sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let uniform_size = std::mem::size_of::<DrawUniforms>() as u64;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ropework uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ropework texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ropework pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(align) * align;
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ropework uniform ring"),
            size: uniform_stride * UNIFORM_SLOTS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ropework uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniforms,
                    offset: 0,
                    size: NonZeroU64::new(uniform_size),
                }),
            }],
        });

        let mut uniform_ring = RingCursor::new();
        uniform_ring.ensure_capacity(UNIFORM_SLOTS);

        let mut backend = Self {
            device,
            queue,
            surface_format,
            surface: None,
            shader,
            texture_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            samplers: HashMap::new(),
            buffers: HashMap::new(),
            next_buffer: 0,
            textures: HashMap::new(),
            texture_groups: HashMap::new(),
            next_texture: 0,
            white: TextureId(u32::MAX),
            uniforms,
            uniform_group,
            uniform_ring,
            uniform_stride,
            pass: None,
            encoder: None,
            pad: Vec::new(),
            warned_no_target: false,
        };
        // Solid-color draws bind this so every program shares one layout.
        backend.white = backend.create_texture(1, 1, &[255; 4]);
        backend
    }

    /// Attaches the swapchain view draws with `target == None` go to.
    pub fn set_surface_target(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        self.surface = Some(SurfaceTarget { view, width, height });
    }

    /// Releases the swapchain view; call after `end_frame`, before present.
    pub fn clear_surface_target(&mut self) {
        self.surface = None;
    }

    // ── frame recording ────────────────────────────────────────────────────

    fn has_pending_draws(&self) -> bool {
        self.pass.as_ref().is_some_and(|p| !p.draws.is_empty())
    }

    fn submit_pending(&mut self) {
        self.encode_pass();
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn encode_pass(&mut self) {
        let Some(pass) = self.pass.take() else {
            return;
        };
        if pass.draws.is_empty() && pass.clear.is_none() {
            return;
        }

        let view = match pass.target {
            None => self.surface.as_ref().map(|s| &s.view),
            Some(id) => self.textures.get(&id).map(|t| &t.view),
        };
        let Some(view) = view else {
            log::warn!("render target {:?} vanished; dropping {} draws", pass.target, pass.draws.len());
            return;
        };

        let encoder = self.encoder.get_or_insert_with(|| {
            self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ropework frame encoder"),
            })
        });

        let load = match pass.clear {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ropework pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for d in &pass.draws {
            let (Some(pipeline), Some(group), Some(vb)) = (
                self.pipelines.get(&d.pipeline),
                self.texture_groups.get(&d.textures),
                self.buffers.get(&d.call.vertex_buffer),
            ) else {
                continue;
            };

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.uniform_group, &[d.uniform_offset]);
            rpass.set_bind_group(1, group, &[]);
            let [x, y, w, h] = d.viewport;
            rpass.set_viewport(x, y, w, h, 0.0, 1.0);
            let [sx, sy, sw, sh] = d.scissor;
            rpass.set_scissor_rect(sx, sy, sw, sh);
            rpass.set_vertex_buffer(0, vb.slice(..));

            let first = d.call.first_vertex;
            match d.call.indexed {
                Some(ix) => {
                    let Some(ib) = self.buffers.get(&ix.buffer) else {
                        continue;
                    };
                    rpass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint16);
                    rpass.draw_indexed(ix.first_index..ix.first_index + ix.index_count, first as i32, 0..1);
                }
                None => rpass.draw(first..first + d.call.vertex_count, 0..1),
            }
        }
    }

    /// Size and color format of a draw target.
    fn target_info(&self, target: Option<TextureId>) -> Option<(u32, u32)> {
        match target {
            None => self.surface.as_ref().map(|s| (s.width, s.height)),
            Some(id) => self
                .textures
                .get(&id)
                .filter(|t| t.render_target)
                .map(|t| (t.width, t.height)),
        }
    }

    // ── lazy state ─────────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("creating pipeline {:?}", key);

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ropework pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(key.program.fragment_entry()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(key.blend.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology.to_wgpu(),
                strip_index_format: key.topology.is_strip().then_some(wgpu::IndexFormat::Uint16),
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        self.pipelines.insert(key, pipeline);
    }

    fn ensure_texture_group(&mut self, texture: TextureId, sampler: SamplerMode) -> bool {
        if self.texture_groups.contains_key(&(texture, sampler)) {
            return true;
        }
        let Some(tex) = self.textures.get(&texture) else {
            return false;
        };
        let device = &self.device;
        let sampler_obj = self
            .samplers
            .entry(sampler)
            .or_insert_with(|| device.create_sampler(&sampler.to_wgpu()));

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ropework texture bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&tex.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler_obj),
                },
            ],
        });
        self.texture_groups.insert((texture, sampler), group);
        true
    }

    fn allocate_texture(&mut self, width: u32, height: u32, render_target: bool) -> TextureId {
        let (format, usage) = if render_target {
            (
                self.surface_format,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            )
        } else {
            (
                TEXTURE_FORMAT,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            )
        };
        let width = width.max(1);
        let height = height.max(1);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ropework texture"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            GpuTexture { texture, view, width, height, render_target },
        );
        id
    }
}

impl GpuBackend for WgpuBackend {
    fn max_buffer_bytes(&self) -> u64 {
        self.device.limits().max_buffer_size
    }

    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> BufferId {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(match kind {
                BufferKind::Vertex => "ropework vertex stream",
                BufferKind::Index => "ropework index stream",
            }),
            size: size_bytes.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT).max(wgpu::COPY_BUFFER_ALIGNMENT),
            usage,
            mapped_at_creation: false,
        });

        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, buffer);
        id
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        // Recorded draws may still name it.
        if self.has_pending_draws() {
            self.submit_pending();
        }
        self.buffers.remove(&id);
    }

    fn write_buffer(&mut self, id: BufferId, offset_bytes: u64, data: &[u8], hint: WriteHint) {
        if hint == WriteHint::Discard && self.has_pending_draws() {
            self.submit_pending();
        }
        let Some(buffer) = self.buffers.get(&id) else {
            log::warn!("write to unknown buffer {:?}", id);
            return;
        };

        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        if data.len() % align == 0 {
            self.queue.write_buffer(buffer, offset_bytes, data);
        } else {
            self.pad.clear();
            self.pad.extend_from_slice(data);
            self.pad.resize(data.len().next_multiple_of(align), 0);
            self.queue.write_buffer(buffer, offset_bytes, &self.pad);
        }
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        let id = self.allocate_texture(width, height, false);
        let Some(tex) = self.textures.get(&id) else {
            return id;
        };
        if rgba.len() as u64 != tex.width as u64 * tex.height as u64 * 4 {
            log::error!(
                "texture data is {} bytes, expected {} for {}x{}",
                rgba.len(),
                tex.width as u64 * tex.height as u64 * 4,
                tex.width,
                tex.height
            );
            return id;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(tex.width * 4),
                rows_per_image: Some(tex.height),
            },
            wgpu::Extent3d { width: tex.width, height: tex.height, depth_or_array_layers: 1 },
        );
        id
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> TextureId {
        self.allocate_texture(width, height, true)
    }

    fn begin_frame(&mut self) {
        self.warned_no_target = false;
    }

    fn clear(&mut self, target: Option<TextureId>, color: Color) {
        let reuse = self
            .pass
            .as_ref()
            .is_some_and(|p| p.target == target && p.draws.is_empty());
        if !reuse {
            self.encode_pass();
        }
        self.pass.get_or_insert_with(|| PendingPass::new(target)).clear = Some(color);
    }

    fn draw(&mut self, state: &DrawState, call: &DrawCall) -> bool {
        let Some((tw, th)) = self.target_info(state.target) else {
            if !self.warned_no_target {
                log::warn!("no render target for draw (target {:?}); skipping", state.target);
                self.warned_no_target = true;
            }
            return false;
        };
        let Some(viewport) = clamp_viewport(state.viewport, tw, th) else {
            return false;
        };
        let scissor = match state.scissor {
            None => [0, 0, tw, th],
            Some(r) => match scissor_rect(r, tw, th) {
                Some(s) => s,
                None => return false,
            },
        };

        let texture = state.texture.unwrap_or(self.white);
        if !self.ensure_texture_group(texture, state.sampler) {
            log::warn!("draw references unknown texture {:?}; skipping", texture);
            return false;
        }
        let key = PipelineKey {
            program: state.program,
            blend: state.blend,
            topology: state.topology,
            format: self.surface_format,
        };
        self.ensure_pipeline(key);

        let slot = self.uniform_ring.allocate(1);
        if slot.wrapped && self.has_pending_draws() {
            self.submit_pending();
        }
        let uniform_offset = slot.offset as u64 * self.uniform_stride;
        self.queue.write_buffer(&self.uniforms, uniform_offset, bytemuck::bytes_of(&state.uniforms));

        if self.pass.as_ref().is_none_or(|p| p.target != state.target) {
            self.encode_pass();
        }
        self.pass
            .get_or_insert_with(|| PendingPass::new(state.target))
            .draws
            .push(RecordedDraw {
                pipeline: key,
                textures: (texture, state.sampler),
                uniform_offset: uniform_offset as u32,
                viewport,
                scissor,
                call: *call,
            });
        true
    }

    fn end_frame(&mut self) {
        self.submit_pending();
    }
}

/// Viewport clipped to the target; `None` when nothing of it is visible.
fn clamp_viewport(viewport: Option<Viewport>, width: u32, height: u32) -> Option<[f32; 4]> {
    let full = Rect::new(0.0, 0.0, width as f32, height as f32);
    let Some(v) = viewport.filter(|v| v.is_valid()) else {
        return Some([0.0, 0.0, full.size.x, full.size.y]);
    };
    Rect::new(v.x, v.y, v.width, v.height)
        .intersect(full)
        .map(|r| [r.origin.x, r.origin.y, r.size.x, r.size.y])
}

/// Scissor in whole target pixels; `None` when fully clipped.
fn scissor_rect(rect: Rect, width: u32, height: u32) -> Option<[u32; 4]> {
    let r = rect.normalized();
    let x0 = r.origin.x.floor().clamp(0.0, width as f32) as u32;
    let y0 = r.origin.y.floor().clamp(0.0, height as f32) as u32;
    let x1 = r.max().x.ceil().clamp(0.0, width as f32) as u32;
    let y1 = r.max().y.ceil().clamp(0.0, height as f32) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0, y0, x1 - x0, y1 - y0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scissor_is_clamped_to_target() {
        assert_eq!(scissor_rect(Rect::new(-10.0, 5.5, 50.0, 10.0), 32, 32), Some([0, 5, 32, 11]));
        assert_eq!(scissor_rect(Rect::new(40.0, 0.0, 5.0, 5.0), 32, 32), None);
    }

    #[test]
    fn viewport_defaults_to_full_target() {
        assert_eq!(clamp_viewport(None, 64, 32), Some([0.0, 0.0, 64.0, 32.0]));
        assert_eq!(
            clamp_viewport(Some(Viewport::with_origin(48.0, 0.0, 32.0, 32.0)), 64, 32),
            Some([48.0, 0.0, 16.0, 32.0])
        );
        assert_eq!(clamp_viewport(Some(Viewport::with_origin(80.0, 0.0, 8.0, 8.0)), 64, 32), None);
    }
}
