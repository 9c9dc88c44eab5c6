//! Immediate-mode drawing on top of a [`RenderSink`].

use crate::coords::{Mat4, Rect, Vec2, Viewport};
use crate::legacy::blend::{GlBlendFactor, blend_mode_for};
use crate::paint::Color;
use crate::render::{
    BlendMode, FrameContext, Material, RenderSink, TextureId, Topology, TransformStack, Vertex,
};

/// Fixed-function style state machine that turns `gl*`-shaped calls into
/// [`DrawCommand`](crate::render::DrawCommand)s.
///
/// Holds the bound texture, client arrays, current color, blend function and
/// a matrix stack. The current matrix becomes each draw's world transform.
pub struct LegacyContext<'a> {
    sink: &'a mut dyn RenderSink,
    transforms: TransformStack,

    texture: Option<TextureId>,
    texture_enabled: bool,
    positions: Vec<Vec2>,
    uvs: Vec<Vec2>,
    colors: Option<Vec<Color>>,
    color: Color,
    blend: BlendMode,

    scratch: Vec<Vertex>,
}

impl<'a> LegacyContext<'a> {
    pub fn new(sink: &'a mut dyn RenderSink) -> Self {
        Self::with_transforms(sink, TransformStack::new())
    }

    /// Resumes with a matrix stack kept from an earlier context.
    pub fn with_transforms(sink: &'a mut dyn RenderSink, transforms: TransformStack) -> Self {
        Self {
            sink,
            transforms,
            texture: None,
            texture_enabled: false,
            positions: Vec::new(),
            uvs: Vec::new(),
            colors: None,
            color: Color::WHITE,
            blend: BlendMode::Premultiplied,
            scratch: Vec::new(),
        }
    }

    /// Gives back the matrix stack so it can outlive the borrowed sink.
    pub fn into_transforms(self) -> TransformStack {
        self.transforms
    }

    #[inline]
    pub fn transforms(&self) -> &TransformStack {
        &self.transforms
    }

    #[inline]
    pub fn transforms_mut(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    #[inline]
    pub fn current_transform(&self) -> Mat4 {
        self.transforms.current()
    }

    // ---- frame ----

    pub fn begin_frame(
        &mut self,
        view: Mat4,
        projection: Mat4,
        render_target: Option<TextureId>,
        viewport: Option<Viewport>,
        scissor: Option<Rect>,
    ) {
        self.sink.begin_frame(FrameContext {
            view,
            projection,
            render_target,
            viewport,
            scissor,
        });
    }

    pub fn end_frame(&mut self) {
        self.sink.end_frame();
    }

    pub fn clear(&mut self, color: Color) {
        self.sink.clear(color);
    }

    pub fn set_viewport(&mut self, viewport: Option<Viewport>, target: Option<TextureId>) {
        self.sink.set_viewport(viewport, target);
    }

    pub fn set_scissor(&mut self, scissor: Option<Rect>) {
        self.sink.set_scissor(scissor);
    }

    pub fn set_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.sink.update_view_projection(view, projection);
    }

    // ---- matrices ----

    pub fn push_matrix(&mut self) {
        self.transforms.push();
    }

    pub fn pop_matrix(&mut self) {
        self.transforms.pop();
    }

    pub fn load_identity(&mut self) {
        self.transforms.load_identity();
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.transforms.translate(x, y, 0.0);
    }

    /// Degrees about Z.
    pub fn rotate(&mut self, degrees: f32) {
        self.transforms.rotate(degrees);
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        self.transforms.scale(x, y, 1.0);
    }

    // ---- state ----

    pub fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    pub fn enable_texture(&mut self) {
        self.texture_enabled = true;
    }

    pub fn disable_texture(&mut self) {
        self.texture_enabled = false;
    }

    pub fn set_vertex_array(&mut self, positions: &[Vec2]) {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
    }

    pub fn set_uv_array(&mut self, uvs: &[Vec2]) {
        self.uvs.clear();
        self.uvs.extend_from_slice(uvs);
    }

    /// Per-vertex colors; `None` falls back to the current color.
    pub fn set_color_array(&mut self, colors: Option<&[Color]>) {
        self.colors = colors.map(<[Color]>::to_vec);
    }

    pub fn color4f(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.color = Color::new(r, g, b, a);
    }

    /// Unsupported factor pairs keep the previous blend mode.
    pub fn blend_func(&mut self, src: GlBlendFactor, dst: GlBlendFactor) {
        match blend_mode_for(src, dst) {
            Some(mode) => self.blend = mode,
            None => log::debug!("blend_func({src:?}, {dst:?}) has no equivalent; keeping {:?}", self.blend),
        }
    }

    #[inline]
    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    /// Material matching the current blend function and color.
    ///
    /// Without vertex colors the current color is baked in as the constant color.
    pub fn material_for_current_state(&self, use_texture: bool, use_vertex_color: bool) -> Material {
        let base = if use_texture {
            Material::textured(self.blend)
        } else {
            Material::solid_color(self.blend)
        };
        let material = base.with_vertex_color(use_vertex_color);
        if use_vertex_color {
            material
        } else {
            material.with_constant_color(self.color)
        }
    }

    // ---- client-array draws ----

    /// Draws the bound arrays through `indices`.
    pub fn draw_elements(&mut self, topology: Topology, indices: &[u16]) {
        if indices.is_empty() || self.positions.is_empty() {
            return;
        }
        let n = self.positions.len();
        if let Some(&bad) = indices.iter().find(|&&i| usize::from(i) >= n) {
            log::warn!("draw_elements: index {bad} outside the {n}-vertex array; draw skipped");
            return;
        }
        self.assemble(0, n);
        self.emit(topology, Some(indices));
    }

    /// Draws `count` consecutive array entries starting at `first`.
    pub fn draw_arrays(&mut self, topology: Topology, first: usize, count: usize) {
        let end = first.saturating_add(count).min(self.positions.len());
        if first >= end {
            return;
        }
        self.assemble(first, end);
        self.emit(topology, None);
    }

    fn assemble(&mut self, first: usize, end: usize) {
        self.scratch.clear();
        for i in first..end {
            let uv = self.uvs.get(i).copied().unwrap_or_default();
            let color = match &self.colors {
                Some(c) => c.get(i).copied().unwrap_or(self.color),
                None => self.color,
            };
            self.scratch.push(Vertex::new(self.positions[i], color, uv));
        }
    }

    fn emit(&mut self, topology: Topology, indices: Option<&[u16]>) {
        let use_texture = self.texture_enabled && self.texture.is_some();
        if self.texture_enabled && self.texture.is_none() {
            log::debug!("texturing enabled with no bound texture; drawing untextured");
        }
        let material = self.material_for_current_state(use_texture, self.colors.is_some());
        let texture = if use_texture { self.texture } else { None };
        let world = self.transforms.current();
        self.sink.draw_mesh(texture, &self.scratch, indices, topology, material, world);
    }

    // ---- vertex-struct draws ----

    /// Textured geometry whose own colors are ignored (drawn white).
    pub fn draw_textured(
        &mut self,
        texture: TextureId,
        vertices: &[Vertex],
        indices: Option<&[u16]>,
        material: Option<Material>,
        topology: Topology,
    ) {
        if vertices.is_empty() {
            return;
        }
        self.scratch.clear();
        self.scratch.extend(vertices.iter().map(|v| Vertex { color: Color::WHITE.to_array(), ..*v }));
        let world = self.transforms.current();
        self.sink.draw_mesh(
            Some(texture),
            &self.scratch,
            indices,
            topology,
            material.unwrap_or(Material::TEXTURED_ALPHA_BLEND),
            world,
        );
    }

    pub fn draw_textured_colored(
        &mut self,
        texture: TextureId,
        vertices: &[Vertex],
        indices: Option<&[u16]>,
        material: Option<Material>,
        topology: Topology,
    ) {
        if vertices.is_empty() {
            return;
        }
        let world = self.transforms.current();
        self.sink.draw_mesh(
            Some(texture),
            vertices,
            indices,
            topology,
            material.unwrap_or(Material::TEXTURED_VERTEX_COLOR_ALPHA_BLEND),
            world,
        );
    }

    /// Untextured geometry; texture coordinates are zeroed.
    pub fn draw_colored(
        &mut self,
        vertices: &[Vertex],
        indices: Option<&[u16]>,
        material: Option<Material>,
        topology: Topology,
    ) {
        if vertices.is_empty() {
            return;
        }
        self.scratch.clear();
        self.scratch.extend(vertices.iter().map(|v| Vertex { uv: [0.0; 2], ..*v }));
        let world = self.transforms.current();
        self.sink.draw_mesh(
            None,
            &self.scratch,
            indices,
            topology,
            material.unwrap_or(Material::SOLID_COLOR_ALPHA_BLEND),
            world,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, IndexSource, RenderStats, VertexSource};

    #[derive(Debug, Clone, PartialEq)]
    struct Recorded {
        texture: Option<TextureId>,
        vertices: Vec<Vertex>,
        indices: Option<Vec<u16>>,
        topology: Topology,
        material: Material,
        world: Mat4,
    }

    #[derive(Default)]
    struct RecordingSink {
        draws: Vec<Recorded>,
        frames: Vec<FrameContext>,
        clears: Vec<Color>,
    }

    impl RenderSink for RecordingSink {
        fn begin_frame(&mut self, frame: FrameContext) {
            self.frames.push(frame);
        }
        fn update_view_projection(&mut self, _view: Mat4, _projection: Mat4) {}
        fn set_viewport(&mut self, _viewport: Option<Viewport>, _target: Option<TextureId>) {}
        fn set_scissor(&mut self, _scissor: Option<Rect>) {}
        fn clear(&mut self, color: Color) {
            self.clears.push(color);
        }
        fn end_frame(&mut self) {}
        fn stats(&self) -> RenderStats {
            RenderStats::default()
        }
        fn submit(&mut self, cmd: &DrawCommand<'_>) {
            let VertexSource::Slice(v) = cmd.vertices else { unreachable!() };
            let indices = cmd.indices.map(|i| match i {
                IndexSource::Slice(i) => i.to_vec(),
                IndexSource::Buffer(_) => unreachable!(),
            });
            self.draws.push(Recorded {
                texture: cmd.texture,
                vertices: v.to_vec(),
                indices,
                topology: cmd.topology,
                material: cmd.material,
                world: cmd.world,
            });
        }
    }

    fn square() -> [Vec2; 4] {
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 10.0),
        ]
    }

    fn unit_uvs() -> [Vec2; 4] {
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        ]
    }

    #[test]
    fn textured_elements_match_a_direct_mesh_draw() {
        let indices = [0u16, 1, 2, 3, 2, 1];
        let tint = Color::new(0.5, 0.5, 0.5, 1.0);

        let mut via_legacy = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut via_legacy);
        gl.translate(5.0, 7.0);
        gl.bind_texture(Some(TextureId(1)));
        gl.enable_texture();
        gl.blend_func(GlBlendFactor::SrcAlpha, GlBlendFactor::One);
        gl.color4f(tint.r, tint.g, tint.b, tint.a);
        gl.set_vertex_array(&square());
        gl.set_uv_array(&unit_uvs());
        gl.draw_elements(Topology::TriangleList, &indices);
        drop(gl);

        let verts: Vec<Vertex> = square()
            .iter()
            .zip(unit_uvs())
            .map(|(&p, uv)| Vertex::new(p, tint, uv))
            .collect();
        let mut direct = RecordingSink::default();
        direct.draw_mesh(
            Some(TextureId(1)),
            &verts,
            Some(&indices),
            Topology::TriangleList,
            Material::textured(BlendMode::Additive).with_constant_color(tint),
            Mat4::translation(5.0, 7.0, 0.0),
        );

        assert_eq!(via_legacy.draws, direct.draws);
    }

    #[test]
    fn color_array_selects_vertex_color_program() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        gl.set_vertex_array(&square());
        gl.set_color_array(Some(&[red; 4]));
        gl.draw_arrays(Topology::TriangleStrip, 0, 4);
        drop(gl);

        let d = &sink.draws[0];
        assert_eq!(d.texture, None);
        assert!(d.material.use_vertex_color);
        assert!(!d.material.use_texture);
        assert_eq!(d.material.constant_color, None);
        assert_eq!(d.vertices[3].color, red.to_array());
        assert_eq!(d.indices, None);
    }

    #[test]
    fn enabled_texturing_without_a_texture_draws_untextured() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        gl.enable_texture();
        gl.set_vertex_array(&square());
        gl.draw_arrays(Topology::TriangleStrip, 0, 4);
        drop(gl);
        assert_eq!(sink.draws[0].texture, None);
        assert!(!sink.draws[0].material.use_texture);
    }

    #[test]
    fn draw_arrays_clamps_to_the_array() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        gl.set_vertex_array(&square());
        gl.draw_arrays(Topology::LineStrip, 2, 10);
        gl.draw_arrays(Topology::LineStrip, 4, 1);
        drop(gl);
        assert_eq!(sink.draws.len(), 1);
        assert_eq!(sink.draws[0].vertices.len(), 2);
    }

    #[test]
    fn out_of_range_indices_skip_the_draw() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        gl.set_vertex_array(&square());
        gl.draw_elements(Topology::TriangleList, &[0, 1, 9]);
        drop(gl);
        assert!(sink.draws.is_empty());
    }

    #[test]
    fn unsupported_blend_pair_keeps_previous_mode() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        gl.blend_func(GlBlendFactor::One, GlBlendFactor::One);
        gl.blend_func(GlBlendFactor::Zero, GlBlendFactor::Zero);
        assert_eq!(gl.blend(), BlendMode::AdditivePremultiplied);
    }

    #[test]
    fn draw_textured_forces_white_and_uses_the_matrix_stack() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        let verts = [Vertex::new(Vec2::new(1.0, 2.0), Color::BLACK, Vec2::new(0.5, 0.5)); 3];

        gl.push_matrix();
        gl.scale(2.0, 2.0);
        gl.draw_textured(TextureId(4), &verts, None, None, Topology::TriangleList);
        gl.pop_matrix();
        gl.draw_colored(&verts, None, None, Topology::TriangleList);
        gl.draw_textured_colored(TextureId(4), &[], None, None, Topology::TriangleList);
        drop(gl);

        assert_eq!(sink.draws.len(), 2);
        assert_eq!(sink.draws[0].vertices[0].color, Color::WHITE.to_array());
        assert_eq!(sink.draws[0].material, Material::TEXTURED_ALPHA_BLEND);
        assert_eq!(sink.draws[0].world, Mat4::scale(2.0, 2.0, 1.0));

        assert_eq!(sink.draws[1].texture, None);
        assert_eq!(sink.draws[1].vertices[0].uv, [0.0, 0.0]);
        assert_eq!(sink.draws[1].vertices[0].color, Color::BLACK.to_array());
        assert_eq!(sink.draws[1].material, Material::SOLID_COLOR_ALPHA_BLEND);
        assert_eq!(sink.draws[1].world, Mat4::IDENTITY);
    }

    #[test]
    fn frame_calls_forward_to_the_sink() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        let projection = Mat4::screen_projection(640.0, 480.0);
        gl.begin_frame(Mat4::IDENTITY, projection, None, None, None);
        gl.clear(Color::BLACK);
        gl.end_frame();
        drop(gl);
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].projection, projection);
        assert_eq!(sink.clears, vec![Color::BLACK]);
    }

    #[test]
    fn transforms_survive_the_context() {
        let mut sink = RecordingSink::default();
        let mut gl = LegacyContext::new(&mut sink);
        gl.translate(3.0, 4.0);
        gl.push_matrix();
        let stack = gl.into_transforms();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current(), Mat4::translation(3.0, 4.0, 0.0));
    }
}
