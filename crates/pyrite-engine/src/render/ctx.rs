use crate::coords::Viewport;

/// Everything the sprite renderer needs from the current frame.
///
/// `viewport` is the drawable size in logical pixels. Sprite geometry is
/// authored in that same space (top-left origin, +Y down); the vertex shader
/// divides by the viewport to reach NDC, so the value must track the window
/// size every frame or sprites render mis-scaled rather than erroring.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub viewport: Viewport,
}

impl<'a> RenderCtx<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
        }
    }
}

/// Where sprite draws land: the frame's command encoder plus the surface
/// color view, already cleared by the frame's clear pass. Sprite passes load
/// the existing contents, so the clear color and earlier draws survive.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}
