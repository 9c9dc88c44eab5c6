use crate::coords::{Mat4, Rect, Viewport};
use crate::render::material::Material;
use crate::render::texture::TextureId;
use crate::render::vertex::Vertex;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl Topology {
    /// Number of primitives formed by `count` elements (indices when
    /// indexed, vertices otherwise). Degenerate counts give 0.
    pub fn primitive_count(self, count: u32) -> u32 {
        match self {
            Topology::PointList => count,
            Topology::LineList => count / 2,
            Topology::LineStrip => count.saturating_sub(1),
            Topology::TriangleList => count / 3,
            Topology::TriangleStrip => count.saturating_sub(2),
        }
    }

    pub(crate) fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::PointList => wgpu::PrimitiveTopology::PointList,
            Topology::LineList => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    pub(crate) fn is_strip(self) -> bool {
        matches!(self, Topology::LineStrip | Topology::TriangleStrip)
    }
}

/// Elements previously written into one of the renderer's streaming buffers.
///
/// Only valid while the buffer's generation matches; a later wrap or
/// reallocation invalidates it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferRange {
    pub offset: u32,
    pub count: u32,
    pub generation: u64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum VertexSource<'a> {
    Slice(&'a [Vertex]),
    Buffer(BufferRange),
}

impl VertexSource<'_> {
    #[inline]
    pub fn len(&self) -> u32 {
        match self {
            VertexSource::Slice(v) => v.len() as u32,
            VertexSource::Buffer(r) => r.count,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IndexSource<'a> {
    Slice(&'a [u16]),
    Buffer(BufferRange),
}

impl IndexSource<'_> {
    #[inline]
    pub fn len(&self) -> u32 {
        match self {
            IndexSource::Slice(i) => i.len() as u32,
            IndexSource::Buffer(r) => r.count,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One draw request. Borrows its geometry and lives for a single frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCommand<'a> {
    pub texture: Option<TextureId>,
    pub vertices: VertexSource<'a>,
    pub indices: Option<IndexSource<'a>>,
    pub topology: Topology,
    pub material: Material,
    pub world: Mat4,
}

impl<'a> DrawCommand<'a> {
    /// Four vertices drawn as a triangle strip (tl, tr, bl, br order).
    pub fn quad(texture: Option<TextureId>, vertices: &'a [Vertex], material: Material, world: Mat4) -> Self {
        Self {
            texture,
            vertices: VertexSource::Slice(vertices),
            indices: None,
            topology: Topology::TriangleStrip,
            material,
            world,
        }
    }

    pub fn mesh(
        texture: Option<TextureId>,
        vertices: &'a [Vertex],
        indices: Option<&'a [u16]>,
        topology: Topology,
        material: Material,
        world: Mat4,
    ) -> Self {
        Self {
            texture,
            vertices: VertexSource::Slice(vertices),
            indices: indices.map(IndexSource::Slice),
            topology,
            material,
            world,
        }
    }

    /// Indexed triangle list, the shape every particle batch takes.
    pub fn particles(
        texture: TextureId,
        vertices: &'a [Vertex],
        indices: &'a [u16],
        material: Material,
        world: Mat4,
    ) -> Self {
        Self::mesh(
            Some(texture),
            vertices,
            Some(indices),
            Topology::TriangleList,
            material,
            world,
        )
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.as_ref().map_or(0, IndexSource::len)
    }

    pub fn primitive_count(&self) -> u32 {
        let elements = match &self.indices {
            Some(i) => i.len(),
            None => self.vertices.len(),
        };
        self.topology.primitive_count(elements)
    }
}

/// Per-frame camera and target state handed to `begin_frame`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameContext {
    pub view: Mat4,
    pub projection: Mat4,
    /// Offscreen target; `None` draws to the presentation surface.
    pub render_target: Option<TextureId>,
    pub viewport: Option<Viewport>,
    pub scissor: Option<Rect>,
}

impl FrameContext {
    /// Identity view with a pixel-space projection for a `width × height` target.
    pub fn screen(width: f32, height: f32) -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::screen_projection(width, height),
            render_target: None,
            viewport: Some(Viewport::new(width, height)),
            scissor: None,
        }
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            render_target: None,
            viewport: None,
            scissor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_counts_per_topology() {
        assert_eq!(Topology::TriangleStrip.primitive_count(4), 2);
        assert_eq!(Topology::TriangleList.primitive_count(6), 2);
        assert_eq!(Topology::LineList.primitive_count(6), 3);
        assert_eq!(Topology::LineStrip.primitive_count(6), 5);
        assert_eq!(Topology::PointList.primitive_count(6), 6);
    }

    #[test]
    fn degenerate_counts_saturate() {
        assert_eq!(Topology::TriangleStrip.primitive_count(1), 0);
        assert_eq!(Topology::LineStrip.primitive_count(0), 0);
        assert_eq!(Topology::TriangleList.primitive_count(2), 0);
    }

    #[test]
    fn indexed_commands_count_indices() {
        let verts = [Vertex::default(); 4];
        let idx = [0u16, 1, 2, 3, 2, 1];
        let cmd = DrawCommand::particles(TextureId(0), &verts, &idx, Material::default(), Mat4::IDENTITY);
        assert_eq!(cmd.primitive_count(), 2);
        assert_eq!(cmd.index_count(), 6);

        let quad = DrawCommand::quad(None, &verts, Material::SOLID_COLOR_ALPHA_BLEND, Mat4::IDENTITY);
        assert_eq!(quad.primitive_count(), 2);
        assert_eq!(quad.index_count(), 0);
    }
}
