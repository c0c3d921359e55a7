use winit::window::{Window, WindowId};

use crate::coords::{ColorRgba, Viewport};
use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{RenderCtx, RenderTarget};
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,

    /// Fatal-error slot owned by the runtime; see [`fail`](Self::fail).
    pub(crate) fatal: &'a mut Option<anyhow::Error>,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Records a fatal application error and exits the loop.
    ///
    /// The error is handed to the runtime and propagates out of
    /// `Runtime::run`, so the process reports a failure exit instead of a
    /// clean shutdown.
    pub fn fail(&mut self, err: anyhow::Error) -> AppControl {
        record_fatal(self.fatal, err)
    }

    /// Clears the surface with `clear`, calls `draw` with a ready [`RenderCtx`]
    /// and [`RenderTarget`], then presents the frame.
    ///
    /// A `draw` error abandons the frame and terminates the run with that
    /// error: a failure mid-frame leaves the framebuffer in an undefined
    /// state, so there is no partial-frame recovery.
    pub fn render<F>(&mut self, clear: ColorRgba, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>) -> anyhow::Result<()>,
    {
        let (w, h) = self.window.logical_size();

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let err_text = err.to_string();
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return self.fail(anyhow::anyhow!("surface error: {err_text}"));
                }
                return AppControl::Continue;
            }
        };

        // Clear pass — dropped before the encoder is moved into submit().
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pyrite clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r as f64,
                            g: clear.g as f64,
                            b: clear.b as f64,
                            a: clear.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let rctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            Viewport::new(w, h),
        );

        // RenderTarget borrows frame.encoder; dropped before submit() takes frame.
        {
            let mut target = RenderTarget {
                encoder: &mut frame.encoder,
                color_view: &frame.view,
            };
            if let Err(e) = draw(&rctx, &mut target) {
                return self.fail(e.context("render failed"));
            }
        }

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}

/// Stores `err` in the runtime's fatal slot and requests exit.
fn record_fatal(slot: &mut Option<anyhow::Error>, err: anyhow::Error) -> AppControl {
    log::error!("fatal: {err:#}");
    *slot = Some(err);
    AppControl::Exit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_preserved_for_the_runtime() {
        let mut slot = None;

        let control = record_fatal(&mut slot, anyhow::anyhow!("texture id 5 out of bounds"));

        assert_eq!(control, AppControl::Exit);
        let err = slot.expect("error must survive until Runtime::run returns it");
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn later_fatal_error_wins_the_slot() {
        // Only one error propagates; the freshest one is the closest to the
        // actual abort point.
        let mut slot = None;
        record_fatal(&mut slot, anyhow::anyhow!("first"));
        record_fatal(&mut slot, anyhow::anyhow!("second"));

        assert_eq!(slot.unwrap().to_string(), "second");
    }
}
