use crate::atlas::TextureId;
use crate::coords::Vec2;

/// Axis-aligned textured quad in logical pixels (top-left origin).
///
/// `end` is the bottom-right corner, derived from `pos + size` at
/// construction and stored. Mutating `size` afterwards does not update it;
/// call [`recompute_corner`](Self::recompute_corner) to re-derive.
///
/// Plain value type; sprites are cheap to copy and the renderer never
/// mutates them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    /// Top-left corner.
    pub pos: Vec2,

    /// Width/height.
    pub size: Vec2,

    /// Bottom-right corner, derived at construction.
    pub end: Vec2,

    /// Atlas texture drawn on this quad.
    pub texture: TextureId,

    /// Invisible sprites produce no draw call.
    pub visible: bool,
}

impl Sprite {
    /// Creates a visible sprite with its bottom-right corner derived from
    /// position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32, texture: TextureId) -> Self {
        let pos = Vec2::new(x, y);
        let size = Vec2::new(width, height);
        Self {
            pos,
            size,
            end: pos + size,
            texture,
            visible: true,
        }
    }

    /// Re-derives the stored bottom-right corner from the current position
    /// and size.
    pub fn recompute_corner(&mut self) {
        self.end = self.pos + self.size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(x: f32, y: f32, w: f32, h: f32) -> Sprite {
        Sprite::new(x, y, w, h, TextureId::new(0))
    }

    #[test]
    fn corner_is_pos_plus_size() {
        let s = sprite(100.0, 100.0, 128.0, 128.0);
        assert_eq!(s.end, Vec2::new(228.0, 228.0));
    }

    #[test]
    fn new_sprites_are_visible() {
        assert!(sprite(0.0, 0.0, 1.0, 1.0).visible);
    }

    #[test]
    fn corner_is_stored_not_computed_on_read() {
        let mut s = sprite(0.0, 0.0, 64.0, 64.0);
        s.size = Vec2::new(128.0, 128.0);

        // Stored corner is stale until explicitly recomputed.
        assert_eq!(s.end, Vec2::new(64.0, 64.0));

        s.recompute_corner();
        assert_eq!(s.end, Vec2::new(128.0, 128.0));
    }

    #[test]
    fn zero_size_sprite_has_degenerate_corner() {
        // Degenerate sprites are legal; the renderer submits them as-is.
        let s = sprite(10.0, 20.0, 0.0, 0.0);
        assert_eq!(s.end, s.pos);
    }
}
