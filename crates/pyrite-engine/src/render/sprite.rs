use std::collections::HashMap;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::atlas::{TextureAtlas, TextureId};
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::Sprite;

/// Renderer for `scene::Sprite` lists.
///
/// One shared vertex buffer holds the frame's quads; each sprite owns a
/// disjoint 4-vertex window of it and is drawn with its own call, in list
/// order. Later sprites overwrite earlier ones where they overlap — there is
/// no batching, no z-ordering, and no culling.
///
/// The pipeline samples one texture per draw; bind groups are created on
/// first use per texture id and cached for the renderer's lifetime (the
/// atlas is write-once, so cached groups never go stale).
#[derive(Default)]
pub struct SpriteRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    viewport_ubo: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,

    // Per-texture bind groups (viewport ubo + texture view + sampler).
    bind_groups: HashMap<TextureId, wgpu::BindGroup>,

    // Shared geometry: one index buffer for all quads, one vertex buffer
    // sized for the current frame's sprite count.
    quad_ibo: Option<wgpu::Buffer>,
    vertex_vbo: Option<wgpu::Buffer>,
    vertex_capacity: usize, // in sprites
}

impl SpriteRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws every visible sprite in `sprites`, in sequence order, on top of
    /// whatever the target already contains (the clear happens in the frame's
    /// clear pass).
    ///
    /// A sprite referencing a texture id outside the atlas is a precondition
    /// violation: the frame is abandoned and the error is propagated.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        atlas: &TextureAtlas,
        sprites: &[Sprite],
    ) -> Result<()> {
        self.ensure_pipeline(ctx);
        self.ensure_sampler(ctx);
        self.ensure_index_buffer(ctx);
        self.ensure_bindings(ctx);

        let quads = frame_geometry(sprites);
        if quads.is_empty() {
            return Ok(());
        }

        // Mutating methods must happen before borrowing pipeline/buffers
        // immutably.
        self.write_viewport_uniform(ctx);
        self.ensure_vertex_capacity(ctx, quads.len());
        for (id, _) in &quads {
            self.ensure_texture_bind_group(ctx, atlas, *id)?;
        }

        let Some(vertex_vbo) = self.vertex_vbo.as_ref() else { return Ok(()) };

        // Each sprite overwrites its own 4-vertex window of the shared
        // buffer. wgpu executes queued writes before the encoded pass runs,
        // so the windows must be disjoint for per-sprite geometry to survive
        // until its draw call.
        let quad_bytes = 4 * std::mem::size_of::<SpriteVertex>();
        for (i, (_, quad)) in quads.iter().enumerate() {
            ctx.queue
                .write_buffer(vertex_vbo, (i * quad_bytes) as u64, bytemuck::cast_slice(quad));
        }

        // Now take immutable borrows.
        let Some(pipeline) = self.pipeline.as_ref() else { return Ok(()) };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return Ok(()) };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pyrite sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, vertex_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        // One draw call per sprite, painter's order.
        for (i, (id, _)) in quads.iter().enumerate() {
            let Some(bind_group) = self.bind_groups.get(id) else { continue };
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.draw_indexed(0..6, (i * 4) as i32, 0..1);
        }

        Ok(())
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pyrite sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pyrite sprite bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(viewport_ubo_min_binding_size()),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pyrite sprite pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pyrite sprite pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    // Opaque composite: later sprites fully overwrite earlier
                    // ones in the overlap region.
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bgl);

        // Bind groups reference the old layout; rebuild them lazily.
        self.bind_groups.clear();
        self.viewport_ubo = None;
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pyrite sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    fn ensure_index_buffer(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_ibo.is_some() {
            return;
        }
        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pyrite sprite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.viewport_ubo.is_some() {
            return;
        }
        self.viewport_ubo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pyrite sprite viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    fn ensure_texture_bind_group(
        &mut self,
        ctx: &RenderCtx<'_>,
        atlas: &TextureAtlas,
        id: TextureId,
    ) -> Result<()> {
        if self.bind_groups.contains_key(&id) {
            return Ok(());
        }

        let texture = atlas.get(id)?;

        let Some(bgl) = self.bind_group_layout.as_ref() else { return Ok(()) };
        let Some(ubo) = self.viewport_ubo.as_ref() else { return Ok(()) };
        let Some(sampler) = self.sampler.as_ref() else { return Ok(()) };

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pyrite sprite bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.bind_groups.insert(id, bind_group);
        Ok(())
    }

    fn write_viewport_uniform(&mut self, ctx: &RenderCtx<'_>) {
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        let u = ViewportUniform {
            viewport: [ctx.viewport.width.max(1.0), ctx.viewport.height.max(1.0)],
            _pad: [0.0; 2],
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, required_sprites: usize) {
        if required_sprites <= self.vertex_capacity && self.vertex_vbo.is_some() {
            return;
        }

        let new_cap = required_sprites.next_power_of_two().max(64);
        let new_size = (new_cap * 4 * std::mem::size_of::<SpriteVertex>()) as u64;

        self.vertex_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pyrite sprite vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }
}

// ── geometry assembly ─────────────────────────────────────────────────────

/// Builds the frame's quads in list order, skipping invisible sprites.
///
/// Pure function so draw order, visibility filtering, and the vertex layout
/// are testable without a GPU device.
fn frame_geometry(sprites: &[Sprite]) -> Vec<(TextureId, [SpriteVertex; 4])> {
    sprites
        .iter()
        .filter(|s| s.visible)
        .map(|s| (s.texture, sprite_quad(s)))
        .collect()
}

/// Four corner vertices for one sprite, fan winding from the top-left:
/// top-left, top-right, bottom-right, bottom-left.
///
/// Positions come from the sprite's stored corners; the UV mapping is fixed:
/// (0,1), (1,1), (1,0), (0,0) in the same corner order.
fn sprite_quad(s: &Sprite) -> [SpriteVertex; 4] {
    [
        SpriteVertex { pos: [s.pos.x, s.pos.y], uv: [0.0, 1.0] },
        SpriteVertex { pos: [s.end.x, s.pos.y], uv: [1.0, 1.0] },
        SpriteVertex { pos: [s.end.x, s.end.y], uv: [1.0, 0.0] },
        SpriteVertex { pos: [s.pos.x, s.end.y], uv: [0.0, 0.0] },
    ]
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct SpriteVertex {
    pos: [f32; 2], // logical px
    uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

/// The expressed triangle-fan: both triangles share the top-left vertex.
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Returns the `wgpu` minimum binding size for the viewport uniform buffer.
///
/// `ViewportUniform` contains two `[f32; 2]` fields (16 bytes total) so its
/// size is always non-zero.
fn viewport_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<ViewportUniform>() as u64)
        .expect("ViewportUniform has non-zero size by construction")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Sprite;

    fn sprite(x: f32, y: f32, w: f32, h: f32, tex: usize) -> Sprite {
        Sprite::new(x, y, w, h, TextureId::new(tex))
    }

    // ── quad layout ───────────────────────────────────────────────────────

    #[test]
    fn quad_corners_come_from_stored_geometry() {
        let s = sprite(10.0, 20.0, 30.0, 40.0, 0);
        let q = sprite_quad(&s);

        assert_eq!(q[0].pos, [10.0, 20.0]); // top-left
        assert_eq!(q[1].pos, [40.0, 20.0]); // top-right
        assert_eq!(q[2].pos, [40.0, 60.0]); // bottom-right
        assert_eq!(q[3].pos, [10.0, 60.0]); // bottom-left
    }

    #[test]
    fn quad_uv_mapping_is_fixed() {
        let q = sprite_quad(&sprite(0.0, 0.0, 1.0, 1.0, 0));

        assert_eq!(q[0].uv, [0.0, 1.0]);
        assert_eq!(q[1].uv, [1.0, 1.0]);
        assert_eq!(q[2].uv, [1.0, 0.0]);
        assert_eq!(q[3].uv, [0.0, 0.0]);
    }

    #[test]
    fn quad_uses_stale_corner_until_recomputed() {
        // The quad reflects the stored end corner, not pos + size.
        let mut s = sprite(0.0, 0.0, 64.0, 64.0, 0);
        s.size = crate::coords::Vec2::new(128.0, 128.0);

        let q = sprite_quad(&s);
        assert_eq!(q[2].pos, [64.0, 64.0]);
    }

    // ── frame assembly ────────────────────────────────────────────────────

    #[test]
    fn invisible_sprites_are_skipped() {
        let mut hidden = sprite(0.0, 0.0, 10.0, 10.0, 0);
        hidden.visible = false;

        let quads = frame_geometry(&[hidden, sprite(5.0, 5.0, 10.0, 10.0, 1)]);

        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].0, TextureId::new(1));
    }

    #[test]
    fn draw_order_follows_list_order() {
        let list = [
            sprite(0.0, 0.0, 64.0, 64.0, 0),
            sprite(32.0, 32.0, 64.0, 64.0, 1),
        ];
        let quads = frame_geometry(&list);

        let ids: Vec<_> = quads.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![TextureId::new(0), TextureId::new(1)]);
    }

    #[test]
    fn assembly_is_deterministic() {
        let list = [
            sprite(100.0, 100.0, 128.0, 128.0, 0),
            sprite(400.0, 200.0, 128.0, 128.0, 1),
        ];
        assert_eq!(frame_geometry(&list), frame_geometry(&list));
    }

    #[test]
    fn degenerate_sprites_are_still_submitted() {
        // No culling: zero-area quads go to the GPU like any other.
        let quads = frame_geometry(&[sprite(50.0, 50.0, 0.0, 0.0, 0)]);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].1[0].pos, quads[0].1[2].pos);
    }
}
