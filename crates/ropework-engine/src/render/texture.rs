use crate::coords::{Quad, Vec2};

/// Opaque handle to a GPU texture owned by a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// One sub-image of an atlas: where it lives (UVs) and how big it is (pixels).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtlasFrame {
    pub uv: Quad,
    pub size: Vec2,
}

impl AtlasFrame {
    /// Frame covering the pixel rect `(x, y, w, h)` of a `tex_w × tex_h` texture.
    pub fn from_pixels(x: f32, y: f32, w: f32, h: f32, tex_w: f32, tex_h: f32) -> Self {
        let u0 = x / tex_w;
        let v0 = y / tex_h;
        let u1 = (x + w) / tex_w;
        let v1 = (y + h) / tex_h;
        Self {
            uv: Quad::new(
                Vec2::new(u0, v0),
                Vec2::new(u1, v0),
                Vec2::new(u0, v1),
                Vec2::new(u1, v1),
            ),
            size: Vec2::new(w, h),
        }
    }
}

/// A texture plus its frame table, indexed by integer frame id.
///
/// Loading atlases is the texture subsystem's job; the engine only consumes
/// the handle and the metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAtlas {
    pub texture: TextureId,
    pub frames: Vec<AtlasFrame>,
}

impl TextureAtlas {
    pub fn new(texture: TextureId, frames: Vec<AtlasFrame>) -> Self {
        Self { texture, frames }
    }

    /// Atlas with a single frame covering the whole `width × height` texture.
    pub fn single(texture: TextureId, width: f32, height: f32) -> Self {
        Self::new(texture, vec![AtlasFrame::from_pixels(0.0, 0.0, width, height, width, height)])
    }

    /// Atlas cut into a regular `cols × rows` grid, frames numbered row-major.
    pub fn grid(texture: TextureId, width: f32, height: f32, cols: u32, rows: u32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let fw = width / cols as f32;
        let fh = height / rows as f32;
        let frames = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c, r)))
            .map(|(c, r)| AtlasFrame::from_pixels(c as f32 * fw, r as f32 * fh, fw, fh, width, height))
            .collect();
        Self::new(texture, frames)
    }

    #[inline]
    pub fn frame(&self, id: usize) -> Option<&AtlasFrame> {
        self.frames.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_frames_are_row_major() {
        let atlas = TextureAtlas::grid(TextureId(1), 64.0, 32.0, 2, 1);
        assert_eq!(atlas.len(), 2);
        let second = atlas.frame(1).unwrap();
        assert_eq!(second.size, Vec2::new(32.0, 32.0));
        assert_eq!(second.uv.tl, Vec2::new(0.5, 0.0));
        assert_eq!(second.uv.br, Vec2::new(1.0, 1.0));
    }
}
