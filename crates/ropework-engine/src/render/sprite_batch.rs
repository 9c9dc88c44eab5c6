//! Slot-addressed textured quads drawn in one batch.

use crate::coords::{Mat4, Quad, Rect, Vec2};
use crate::paint::Color;
use crate::render::command::DrawCommand;
use crate::render::material::Material;
use crate::render::quad_batch::{MAX_QUADS_PER_BATCH, QuadBatcher};
use crate::render::renderer::RenderSink;
use crate::render::texture::{TextureAtlas, TextureId};

/// Position/UV quads (and optional per-corner colors) for one texture.
///
/// Slots grow on demand; drawing takes a prefix of `count` slots.
#[derive(Debug)]
pub struct SpriteBatch {
    texture: TextureId,
    positions: Vec<Quad>,
    uvs: Vec<Quad>,
    colors: Vec<Color>,
    scratch: QuadBatcher,
}

impl SpriteBatch {
    pub fn new(texture: TextureId, capacity: usize) -> Self {
        Self {
            texture,
            positions: vec![Quad::default(); capacity],
            uvs: vec![Quad::default(); capacity],
            colors: Vec::new(),
            scratch: QuadBatcher::new(),
        }
    }

    #[inline]
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn positions(&self) -> &[Quad] {
        &self.positions
    }

    #[inline]
    pub fn uvs(&self) -> &[Quad] {
        &self.uvs
    }

    /// Four colors per slot, in corner order. Empty until `set_colors_at` is used.
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn set_quad_at(&mut self, uv: Quad, pos: Quad, slot: usize) {
        self.ensure_slot(slot);
        self.uvs[slot] = uv;
        self.positions[slot] = pos;
    }

    pub fn set_position_at(&mut self, pos: Quad, slot: usize) {
        self.ensure_slot(slot);
        self.positions[slot] = pos;
    }

    pub fn set_colors_at(&mut self, colors: [Color; 4], slot: usize) {
        self.ensure_slot(slot);
        if self.colors.len() < self.positions.len() * 4 {
            self.colors.resize(self.positions.len() * 4, Color::WHITE);
        }
        self.colors[slot * 4..slot * 4 + 4].copy_from_slice(&colors);
    }

    /// Places atlas frame `frame` with its top-left corner at `(x, y)`.
    /// Unknown frame ids leave the slot untouched.
    pub fn map_frame_at(&mut self, atlas: &TextureAtlas, frame: usize, x: f32, y: f32, slot: usize) {
        let Some(f) = atlas.frame(frame) else {
            log::debug!("atlas frame {frame} out of range ({} frames)", atlas.len());
            return;
        };
        let pos = Rect { origin: Vec2::new(x, y), size: f.size }.to_quad();
        self.set_quad_at(f.uv, pos, slot);
    }

    /// Copies slot `from` over slot `to` (geometry and colors).
    pub fn copy_slot(&mut self, from: usize, to: usize) {
        self.positions[to] = self.positions[from];
        self.uvs[to] = self.uvs[from];
        if self.colors.len() >= (from.max(to) + 1) * 4 {
            self.colors.copy_within(from * 4..from * 4 + 4, to * 4);
        }
    }

    /// Draws the first `count` slots.
    ///
    /// Uses the sink's quad path when it has one; otherwise builds the mesh
    /// here and submits it as an indexed triangle list.
    pub fn draw(&mut self, sink: &mut dyn RenderSink, count: usize, material: Material, world: Mat4) {
        let count = count.min(self.positions.len());
        if count == 0 {
            return;
        }
        let colors = (self.colors.len() >= count * 4).then_some(self.colors.as_slice());

        if let Some(quads) = sink.as_quad_batcher() {
            quads.draw_textured_quads(self.texture, &self.positions, &self.uvs, colors, count, material, world);
            return;
        }

        let mut start = 0;
        while start < count {
            let n = (count - start).min(MAX_QUADS_PER_BATCH);
            let chunk_colors = colors.map(|c| &c[start * 4..]);
            if let Some(batch) = self.scratch.build_for(
                &self.positions[start..],
                &self.uvs[start..],
                chunk_colors,
                n,
                &material,
            ) {
                sink.submit(&DrawCommand::particles(self.texture, batch.vertices, batch.indices, material, world));
            }
            start += n;
        }
    }

    fn ensure_slot(&mut self, slot: usize) {
        if slot >= self.positions.len() {
            self.positions.resize(slot + 1, Quad::default());
            self.uvs.resize(slot + 1, Quad::default());
            if !self.colors.is_empty() {
                self.colors.resize((slot + 1) * 4, Color::WHITE);
            }
        }
    }
}
