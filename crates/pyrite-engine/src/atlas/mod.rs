//! Texture atlas: decoded image files uploaded as GPU textures.
//!
//! The atlas is write-once, read-many: textures are loaded up front in path
//! order (insertion order = id) and live for the lifetime of the atlas.
//! There is no caching/dedup and no unload path.

mod decode;
mod error;
mod texture_atlas;

pub use error::AtlasError;
pub use texture_atlas::{SpriteTexture, TextureAtlas, TextureId};
