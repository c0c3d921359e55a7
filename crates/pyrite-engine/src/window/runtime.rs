use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "pyrite".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
///
/// The runtime owns the process-wide windowing state explicitly: one
/// `EventLoop`, one window, one GPU context. Construction is guarded (all
/// failures surface as errors from [`run`](Self::run)) and teardown happens
/// exactly once, on every exit path, by dropping the window entry.
pub struct Runtime;

impl Runtime {
    /// Creates the window + GPU context and drives the loop until the window
    /// is closed or the app requests exit.
    ///
    /// Fails if the event loop, window, surface, adapter, or device cannot
    /// be created, or if the app records a fatal error via
    /// [`FrameCtx::fail`](crate::core::FrameCtx::fail) (also the route taken
    /// by a failed draw closure).
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        if let Some(err) = state.startup_error.take() {
            return Err(err.context("window/context initialization failed"));
        }
        if let Some(err) = state.fatal_error.take() {
            return Err(err);
        }

        Ok(())
    }
}

// The surface inside `Gpu` borrows the window; tying both into one
// self-referencing entry keeps their lifetimes honest and makes teardown a
// single drop (GPU context first, then the window).
#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Loop state: Running while the window entry is live, Terminated after it
/// has been torn down.
struct RuntimeState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    startup_error: Option<anyhow::Error>,

    // Filled through `FrameCtx::fail`; returned from `Runtime::run`.
    fatal_error: Option<anyhow::Error>,

    terminated: bool,
}

impl<A> RuntimeState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            startup_error: None,
            fatal_error: None,
            terminated: false,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        WindowEntryTryBuilder {
            clock: FrameClock::new(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
    }

    /// Transitions Running → Terminated, releasing window + GPU resources
    /// exactly once.
    fn terminate(&mut self, event_loop: &ActiveEventLoop) {
        if !self.terminated {
            self.entry = None;
            self.terminated = true;
        }
        event_loop.exit();
    }
}

impl<A> ApplicationHandler for RuntimeState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.terminated || self.entry.is_some() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.startup_error = Some(e);
                self.terminate(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.terminated {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the sprite list is redrawn every iteration.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.terminated {
            event_loop.exit();
            return;
        }

        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (app, entry, fatal) = (&mut self.app, &mut self.entry, &mut self.fatal_error);

        let Some(entry) = entry.as_mut() else {
            return;
        };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.terminate(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                entry.with_mut(|fields| {
                    fields.gpu.resize(new_size);
                    // A reconfigure can stall; keep the stall out of the next dt.
                    fields.clock.reset();
                });
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_mut(|fields| {
                    fields.gpu.resize(new_size);
                    fields.clock.reset();
                });
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => {
                let mut control = AppControl::Continue;

                entry.with_mut(|fields| {
                    let ft: FrameTime = fields.clock.tick();

                    let mut ctx = FrameCtx {
                        window: WindowCtx {
                            id: window_id,
                            window: fields.window,
                        },
                        gpu: fields.gpu,
                        time: ft,
                        fatal,
                    };

                    control = app.on_frame(&mut ctx);
                });

                if control == AppControl::Exit {
                    self.terminate(event_loop);
                }
            }

            _ => {}
        }
    }
}
