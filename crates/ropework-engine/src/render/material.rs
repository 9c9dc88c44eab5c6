use crate::paint::Color;

/// Framebuffer blend equation, named by source/destination factors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// (One, Zero)
    Opaque,
    /// (One, OneMinusSrcAlpha): premultiplied-alpha "over".
    Premultiplied,
    /// (SrcAlpha, OneMinusSrcAlpha): straight-alpha "over".
    NonPremultiplied,
    /// (SrcAlpha, One)
    Additive,
    /// (One, One)
    AdditivePremultiplied,
}

impl BlendMode {
    /// Whether vertex and constant colors must be premultiplied before blending.
    #[inline]
    pub fn premultiplies(self) -> bool {
        matches!(self, BlendMode::Premultiplied | BlendMode::AdditivePremultiplied)
    }

    pub(crate) fn to_wgpu(self) -> wgpu::BlendState {
        use wgpu::{BlendComponent, BlendFactor, BlendOperation, BlendState};

        let additive = |src| BlendState {
            color: BlendComponent {
                src_factor: src,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
        };

        match self {
            BlendMode::Opaque => BlendState::REPLACE,
            BlendMode::Premultiplied => BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            BlendMode::NonPremultiplied => BlendState::ALPHA_BLENDING,
            BlendMode::Additive => additive(BlendFactor::SrcAlpha),
            BlendMode::AdditivePremultiplied => additive(BlendFactor::One),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SamplerMode {
    LinearClamp,
    PointClamp,
    LinearWrap,
    PointWrap,
}

impl SamplerMode {
    pub(crate) fn to_wgpu(self) -> wgpu::SamplerDescriptor<'static> {
        let (filter, address) = match self {
            SamplerMode::LinearClamp => (wgpu::FilterMode::Linear, wgpu::AddressMode::ClampToEdge),
            SamplerMode::PointClamp => (wgpu::FilterMode::Nearest, wgpu::AddressMode::ClampToEdge),
            SamplerMode::LinearWrap => (wgpu::FilterMode::Linear, wgpu::AddressMode::Repeat),
            SamplerMode::PointWrap => (wgpu::FilterMode::Nearest, wgpu::AddressMode::Repeat),
        };
        wgpu::SamplerDescriptor {
            label: Some("ropework sampler"),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }
    }
}

/// GPU program variant. Chosen from material flags only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Program {
    /// Vertex color × diffuse.
    SolidColor,
    /// Texture × diffuse; vertex colors ignored.
    Textured,
    /// Texture × vertex color × diffuse.
    TexturedVertexColor,
}

impl Program {
    pub fn select(material: &Material) -> Program {
        match (material.use_texture, material.use_vertex_color) {
            (false, _) => Program::SolidColor,
            (true, false) => Program::Textured,
            (true, true) => Program::TexturedVertexColor,
        }
    }

    pub(crate) fn fragment_entry(self) -> &'static str {
        match self {
            Program::SolidColor => "fs_solid",
            Program::Textured => "fs_textured",
            Program::TexturedVertexColor => "fs_textured_color",
        }
    }
}

/// Immutable description of how a draw is shaded and blended.
///
/// Cheap to copy; the presets below are plain constants so building a draw
/// never allocates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub blend: BlendMode,
    pub sampler: SamplerMode,
    pub constant_color: Option<Color>,
    pub use_texture: bool,
    pub use_vertex_color: bool,
}

impl Material {
    pub const TEXTURED_ALPHA_BLEND: Material = Material::textured(BlendMode::Premultiplied);
    pub const TEXTURED_ADDITIVE: Material = Material::textured(BlendMode::Additive);
    pub const TEXTURED_OPAQUE: Material = Material::textured(BlendMode::Opaque);
    pub const TEXTURED_NON_PREMULTIPLIED: Material = Material::textured(BlendMode::NonPremultiplied);
    pub const TEXTURED_VERTEX_COLOR_ALPHA_BLEND: Material =
        Material::textured(BlendMode::Premultiplied).with_vertex_color(true);
    pub const TEXTURED_VERTEX_COLOR_ADDITIVE: Material =
        Material::textured(BlendMode::Additive).with_vertex_color(true);
    pub const SOLID_COLOR_ALPHA_BLEND: Material = Material::solid_color(BlendMode::Premultiplied);
    pub const SOLID_COLOR_ADDITIVE: Material = Material::solid_color(BlendMode::Additive);

    pub const fn textured(blend: BlendMode) -> Self {
        Self {
            blend,
            sampler: SamplerMode::LinearClamp,
            constant_color: None,
            use_texture: true,
            use_vertex_color: false,
        }
    }

    pub const fn solid_color(blend: BlendMode) -> Self {
        Self {
            blend,
            sampler: SamplerMode::LinearClamp,
            constant_color: None,
            use_texture: false,
            use_vertex_color: true,
        }
    }

    pub const fn with_vertex_color(mut self, on: bool) -> Self {
        self.use_vertex_color = on;
        self
    }

    pub const fn with_constant_color(mut self, color: Color) -> Self {
        self.constant_color = Some(color);
        self
    }

    pub const fn with_sampler(mut self, sampler: SamplerMode) -> Self {
        self.sampler = sampler;
        self
    }

    /// Color multiplied into every fragment: the constant color if set,
    /// otherwise white so vertex colors pass through unchanged.
    #[inline]
    pub fn diffuse(&self) -> Color {
        self.constant_color.unwrap_or(Color::WHITE)
    }

    #[inline]
    pub fn program(&self) -> Program {
        Program::select(self)
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::TEXTURED_ALPHA_BLEND
    }
}
