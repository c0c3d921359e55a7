use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the texture atlas.
///
/// Both variants are terminal for the current run: a load failure leaves no
/// partial atlas behind, and an out-of-bounds id in the draw path is a
/// precondition violation rather than something to clamp or skip.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// An image file was missing or could not be decoded.
    #[error("failed to load texture from {path:?}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A texture id referenced an index outside the atlas.
    #[error("texture id {index} out of bounds for atlas with {len} textures")]
    IndexOutOfBounds { index: usize, len: usize },
}
