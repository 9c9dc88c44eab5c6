//! Quad batching: N textured quads → one vertex stream + one shared index list.

use crate::coords::{Mat4, Quad};
use crate::paint::Color;
use crate::render::material::Material;
use crate::render::texture::TextureId;
use crate::render::vertex::Vertex;

/// Largest batch addressable with 16-bit indices (4 vertices per quad).
pub const MAX_QUADS_PER_BATCH: usize = 16384;

/// Index pattern for one quad whose corners are laid out tl, tr, bl, br.
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 3, 2, 1];

/// Sink that can take quads directly, without a caller-side mesh build.
pub trait QuadBatchRenderer {
    /// `colors`, when long enough, holds 4 colors per quad in corner order.
    fn draw_textured_quads(
        &mut self,
        texture: TextureId,
        positions: &[Quad],
        uvs: &[Quad],
        colors: Option<&[Color]>,
        quad_count: usize,
        material: Material,
        world: Mat4,
    );
}

/// Geometry produced by [`QuadBatcher::build`]; borrows the batcher's scratch.
#[derive(Debug, Copy, Clone)]
pub struct QuadBatch<'a> {
    pub vertices: &'a [Vertex],
    pub indices: &'a [u16],
    pub quad_count: usize,
}

/// Reusable CPU-side builder. The index list only changes when the quad
/// capacity grows; smaller batches reuse a prefix of it.
#[derive(Debug, Default)]
pub struct QuadBatcher {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    capacity: usize,
}

impl QuadBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quads covered by the current index list.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Builds `quad_count` quads. Returns `None` when there is nothing to draw
    /// or the inputs are too short.
    ///
    /// Colors are used when at least `4 * quad_count` are given; otherwise
    /// every vertex takes `fallback`.
    ///
    /// # Panics
    /// If `quad_count > MAX_QUADS_PER_BATCH`.
    pub fn build(
        &mut self,
        positions: &[Quad],
        uvs: &[Quad],
        colors: Option<&[Color]>,
        quad_count: usize,
        fallback: Color,
    ) -> Option<QuadBatch<'_>> {
        assert!(
            quad_count <= MAX_QUADS_PER_BATCH,
            "quad batch of {quad_count} exceeds {MAX_QUADS_PER_BATCH}"
        );
        if quad_count == 0 || positions.len() < quad_count || uvs.len() < quad_count {
            return None;
        }

        self.ensure_indices(quad_count);

        let colors = colors.filter(|c| c.len() >= quad_count * 4);
        self.vertices.clear();
        for (i, (pos, uv)) in positions.iter().zip(uvs).take(quad_count).enumerate() {
            let corner = |k: usize| colors.map_or(fallback, |c| c[i * 4 + k]);
            let p = pos.corners();
            let t = uv.corners();
            for k in 0..4 {
                self.vertices.push(Vertex::new(p[k], corner(k), t[k]));
            }
        }

        Some(QuadBatch {
            vertices: &self.vertices,
            indices: &self.indices[..quad_count * 6],
            quad_count,
        })
    }

    /// Convenience for materials: falls back to the constant color, or white.
    pub fn build_for(
        &mut self,
        positions: &[Quad],
        uvs: &[Quad],
        colors: Option<&[Color]>,
        quad_count: usize,
        material: &Material,
    ) -> Option<QuadBatch<'_>> {
        self.build(positions, uvs, colors, quad_count, material.diffuse())
    }

    fn ensure_indices(&mut self, quad_count: usize) {
        if quad_count <= self.capacity {
            return;
        }
        let capacity = quad_count.next_power_of_two().min(MAX_QUADS_PER_BATCH);
        self.indices.clear();
        self.indices.reserve(capacity * 6);
        for q in 0..capacity {
            let base = (q * 4) as u16;
            self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
        }
        self.capacity = capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Rect, Vec2};

    fn quads(n: usize) -> Vec<Quad> {
        (0..n).map(|i| Rect::new(i as f32 * 10.0, 0.0, 8.0, 8.0).to_quad()).collect()
    }

    #[test]
    fn index_pattern_offsets_per_quad() {
        let mut b = QuadBatcher::new();
        let pos = quads(2);
        let batch = b.build(&pos, &pos, None, 2, Color::WHITE).unwrap();
        assert_eq!(batch.indices, &[0, 1, 2, 3, 2, 1, 4, 5, 6, 7, 6, 5]);
        assert_eq!(batch.vertices.len(), 8);
        assert_eq!(batch.vertices[4].position(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn capacity_grows_once_and_prefix_is_reused() {
        let mut b = QuadBatcher::new();
        let pos = quads(5);
        let big: Vec<u16> = b.build(&pos, &pos, None, 5, Color::WHITE).unwrap().indices.to_vec();
        assert_eq!(b.capacity(), 8);

        let small = b.build(&pos, &pos, None, 3, Color::WHITE).unwrap();
        assert_eq!(small.indices, &big[..18]);
        assert_eq!(small.vertices.len(), 12);
        assert_eq!(b.capacity(), 8);
    }

    #[test]
    fn short_color_arrays_fall_back() {
        let mut b = QuadBatcher::new();
        let pos = quads(2);
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        let colors = [red; 7];
        let batch = b
            .build_for(&pos, &pos, Some(&colors), 2, &Material::TEXTURED_ADDITIVE)
            .unwrap();
        assert!(batch.vertices.iter().all(|v| v.color == Color::WHITE.to_array()));

        let tinted = Material::TEXTURED_ADDITIVE.with_constant_color(red);
        let batch = b.build_for(&pos, &pos, None, 2, &tinted).unwrap();
        assert!(batch.vertices.iter().all(|v| v.color == red.to_array()));
    }

    #[test]
    fn per_vertex_colors_follow_corner_order() {
        let mut b = QuadBatcher::new();
        let pos = quads(1);
        let colors = [
            Color::new(1.0, 0.0, 0.0, 1.0),
            Color::new(0.0, 1.0, 0.0, 1.0),
            Color::new(0.0, 0.0, 1.0, 1.0),
            Color::WHITE,
        ];
        let batch = b.build(&pos, &pos, Some(&colors), 1, Color::BLACK).unwrap();
        for (v, c) in batch.vertices.iter().zip(colors) {
            assert_eq!(v.color, c.to_array());
        }
    }

    #[test]
    fn empty_or_short_inputs_build_nothing() {
        let mut b = QuadBatcher::new();
        let pos = quads(2);
        assert!(b.build(&pos, &pos, None, 0, Color::WHITE).is_none());
        assert!(b.build(&pos, &pos[..1], None, 2, Color::WHITE).is_none());
        assert!(b.build(&pos[..1], &pos, None, 2, Color::WHITE).is_none());
    }

    #[test]
    fn full_batch_indices_fit_in_u16() {
        let mut b = QuadBatcher::new();
        let pos = quads(MAX_QUADS_PER_BATCH);
        let batch = b.build(&pos, &pos, None, MAX_QUADS_PER_BATCH, Color::WHITE).unwrap();
        assert_eq!(batch.indices.iter().copied().max(), Some(u16::MAX));
    }

    #[test]
    fn every_batch_size_has_six_in_range_indices_per_quad() {
        let mut sizes: Vec<usize> = (1..=64).chain((65..=MAX_QUADS_PER_BATCH).step_by(509)).collect();
        for shift in 7..=14 {
            let p = 1usize << shift;
            sizes.extend([p - 1, p, (p + 1).min(MAX_QUADS_PER_BATCH)]);
        }

        let pos = quads(MAX_QUADS_PER_BATCH);
        let mut b = QuadBatcher::new();
        for &q in &sizes {
            let batch = b.build(&pos, &pos, None, q, Color::WHITE).unwrap();
            assert_eq!(batch.indices.len(), 6 * q, "quad count {q}");
            assert_eq!(batch.vertices.len(), 4 * q, "quad count {q}");
            assert!(batch.indices.iter().all(|&i| (i as usize) < 4 * q), "quad count {q}");
        }

        // Every prefix of the full list is a valid batch on its own.
        let full = b.build(&pos, &pos, None, MAX_QUADS_PER_BATCH, Color::WHITE).unwrap();
        let mut highest = 0usize;
        for (q, chunk) in full.indices.chunks(6).enumerate() {
            highest = highest.max(chunk.iter().copied().max().unwrap_or(0) as usize);
            assert!(highest < 4 * (q + 1), "quad count {}", q + 1);
        }
    }
}
