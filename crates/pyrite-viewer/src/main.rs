use std::path::{Path, PathBuf};

use anyhow::Result;
use winit::dpi::LogicalSize;

use pyrite_engine::atlas::{TextureAtlas, TextureId};
use pyrite_engine::coords::ColorRgba;
use pyrite_engine::core::{App, AppControl, FrameCtx};
use pyrite_engine::device::GpuInit;
use pyrite_engine::logging::{init_logging, LoggingConfig};
use pyrite_engine::render::SpriteRenderer;
use pyrite_engine::scene::Sprite;
use pyrite_engine::window::{Runtime, RuntimeConfig};

/// Fixed texture set, loaded in order: list position = texture id.
const TEXTURE_FILES: &[&str] = &["assets/red.png", "assets/blue.png"];

/// Absolute asset paths, anchored to this crate's directory so the viewer
/// works from any working directory.
fn texture_paths() -> Vec<PathBuf> {
    let base = Path::new(env!("CARGO_MANIFEST_DIR"));
    TEXTURE_FILES.iter().map(|f| base.join(f)).collect()
}

const CLEAR_COLOR: ColorRgba = ColorRgba::gray(0.1);

struct ViewerApp {
    renderer: SpriteRenderer,
    sprites: Vec<Sprite>,

    // Loaded on the first frame; texture upload needs a live device/queue.
    atlas: Option<TextureAtlas>,
}

impl ViewerApp {
    fn new() -> Self {
        Self {
            renderer: SpriteRenderer::new(),
            sprites: vec![
                Sprite::new(100.0, 100.0, 128.0, 128.0, TextureId::new(0)),
                Sprite::new(400.0, 200.0, 128.0, 128.0, TextureId::new(1)),
            ],
            atlas: None,
        }
    }
}

impl App for ViewerApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.atlas.is_none() {
            match TextureAtlas::load(ctx.gpu.device(), ctx.gpu.queue(), &texture_paths()) {
                Ok(atlas) => self.atlas = Some(atlas),
                Err(e) => {
                    return ctx.fail(anyhow::Error::new(e).context("atlas load failed"));
                }
            }
        }
        let Some(atlas) = self.atlas.as_ref() else {
            return AppControl::Exit;
        };

        if ctx.time.frame_index % 600 == 0 {
            log::debug!(
                "frame {} ({} sprite(s), dt {:.4}s)",
                ctx.time.frame_index,
                self.sprites.len(),
                ctx.time.dt
            );
        }

        let renderer = &mut self.renderer;
        let sprites = &self.sprites;
        ctx.render(CLEAR_COLOR, |rctx, target| {
            renderer.render(rctx, target, atlas, sprites)
        })
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Pyrite Viewer".to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
    };

    Runtime::run(config, GpuInit::default(), ViewerApp::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_paths_resolve_from_any_working_directory() {
        let paths = texture_paths();
        assert_eq!(paths.len(), 2);
        for p in &paths {
            assert!(p.starts_with(env!("CARGO_MANIFEST_DIR")));
            assert!(p.exists(), "bundled asset missing: {}", p.display());
        }
    }

    #[test]
    fn texture_list_order_matches_sprite_ids() {
        let paths = texture_paths();
        assert!(paths[0].ends_with("red.png"));
        assert!(paths[1].ends_with("blue.png"));
    }
}
