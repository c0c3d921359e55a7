//! GPU rendering subsystem.
//!
//! The sprite renderer consumes plain `scene::Sprite` lists and issues GPU
//! commands via wgpu. It owns its GPU resources (pipeline, buffers, bind
//! groups).
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shader converts to NDC using a viewport uniform.

mod ctx;
mod sprite;

pub use ctx::{RenderCtx, RenderTarget};
pub use sprite::SpriteRenderer;
