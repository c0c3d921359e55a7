use std::path::Path;

use super::decode::decode_rgba;
use super::AtlasError;

/// Typed handle into a [`TextureAtlas`].
///
/// Ids are plain positions in load order; the atlas bounds-checks every
/// resolution, so a stale or fabricated id surfaces as an explicit
/// [`AtlasError::IndexOutOfBounds`] instead of an unchecked access.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(usize);

impl TextureId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A single uploaded texture.
pub struct SpriteTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl SpriteTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Texture size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Ordered list of GPU textures, one per loaded image file.
///
/// Load order defines the id space: the first path becomes `TextureId(0)`,
/// the second `TextureId(1)`, and so on.
pub struct TextureAtlas {
    entries: Vec<SpriteTexture>,
}

impl TextureAtlas {
    /// Decodes and uploads every path, in order.
    ///
    /// A missing or undecodable file fails the whole load; no partial atlas
    /// is returned.
    pub fn load<P: AsRef<Path>>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        paths: &[P],
    ) -> Result<Self, AtlasError> {
        let mut entries = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            let pixels = decode_rgba(path)?;
            let (width, height) = pixels.dimensions();

            log::debug!("atlas: loaded {path:?} ({width}×{height})");

            entries.push(upload_rgba(device, queue, &pixels, width, height));
        }

        log::info!("atlas: {} texture(s) loaded", entries.len());
        Ok(Self { entries })
    }

    /// Resolves a texture id, failing if it is outside the atlas.
    pub fn get(&self, id: TextureId) -> Result<&SpriteTexture, AtlasError> {
        let index = check_index(id.index(), self.entries.len())?;
        Ok(&self.entries[index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bounds check for atlas resolution, kept free of GPU state so it is
/// testable on its own.
fn check_index(index: usize, len: usize) -> Result<usize, AtlasError> {
    if index < len {
        Ok(index)
    } else {
        Err(AtlasError::IndexOutOfBounds { index, len })
    }
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> SpriteTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("pyrite atlas texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    SpriteTexture {
        texture,
        view,
        size: (width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── bounds checks ─────────────────────────────────────────────────────

    #[test]
    fn in_bounds_index_resolves() {
        assert_eq!(check_index(0, 2).unwrap(), 0);
        assert_eq!(check_index(1, 2).unwrap(), 1);
    }

    #[test]
    fn index_past_end_fails() {
        // A 2-texture atlas rejects id 5.
        match check_index(5, 2).unwrap_err() {
            AtlasError::IndexOutOfBounds { index, len } => {
                assert_eq!(index, 5);
                assert_eq!(len, 2);
            }
            other => panic!("expected IndexOutOfBounds, got {other:?}"),
        }
    }

    #[test]
    fn empty_atlas_rejects_everything() {
        assert!(check_index(0, 0).is_err());
    }

    // ── ids ───────────────────────────────────────────────────────────────

    #[test]
    fn texture_id_round_trips_index() {
        assert_eq!(TextureId::new(3).index(), 3);
    }
}
