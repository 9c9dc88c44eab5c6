use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;
use crate::paint::Color;

/// Position + color + texture coordinate, the only vertex format the
/// renderer streams.
///
/// Colors are straight alpha; the shader premultiplies when the blend mode
/// asks for it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    #[inline]
    pub fn new(pos: Vec2, color: Color, uv: Vec2) -> Self {
        Self {
            pos: [pos.x, pos.y, 0.0],
            color: color.to_array(),
            uv: [uv.x, uv.y],
        }
    }

    /// Textured vertex without a color of its own (white).
    #[inline]
    pub fn textured(pos: Vec2, uv: Vec2) -> Self {
        Self::new(pos, Color::WHITE, uv)
    }

    /// Untextured colored vertex.
    #[inline]
    pub fn colored(pos: Vec2, color: Color) -> Self {
        Self::new(pos, color, Vec2::zero())
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.pos[0], self.pos[1])
    }

    pub(crate) const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // pos
        1 => Float32x4, // color
        2 => Float32x2  // uv
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}
