use crate::render::BlendMode;

/// Blend factors accepted by [`LegacyContext::blend_func`](super::LegacyContext::blend_func).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlBlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Maps a `(src, dst)` factor pair onto a renderer blend mode.
///
/// Returns `None` for pairs the renderer has no equivalent for.
pub fn blend_mode_for(src: GlBlendFactor, dst: GlBlendFactor) -> Option<BlendMode> {
    use GlBlendFactor::*;

    match (src, dst) {
        (One, Zero) => Some(BlendMode::Opaque),
        (One, OneMinusSrcAlpha) => Some(BlendMode::Premultiplied),
        (SrcAlpha, OneMinusSrcAlpha) => Some(BlendMode::NonPremultiplied),
        (SrcAlpha, One) => Some(BlendMode::Additive),
        (One, One) => Some(BlendMode::AdditivePremultiplied),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairs_map_to_blend_modes() {
        use GlBlendFactor::*;
        assert_eq!(blend_mode_for(One, OneMinusSrcAlpha), Some(BlendMode::Premultiplied));
        assert_eq!(blend_mode_for(SrcAlpha, One), Some(BlendMode::Additive));
        assert_eq!(blend_mode_for(SrcAlpha, OneMinusSrcAlpha), Some(BlendMode::NonPremultiplied));
        assert_eq!(blend_mode_for(One, Zero), Some(BlendMode::Opaque));
        assert_eq!(blend_mode_for(Zero, SrcAlpha), None);
    }
}
