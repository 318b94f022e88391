use std::sync::Arc;

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{Harness, Scene};
use crate::device::{DeviceConfig, DeviceError, Rotation, WindowTarget};
use crate::gpu::{WgpuBackend, WgpuOptions};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub backend: WgpuOptions,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let size = crate::core::default_size();
        Self {
            title: "rekindle".to_string(),
            initial_size: LogicalSize::new(size.width as f64, size.height as f64),
            backend: WgpuOptions::default(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `scene` through the device lifecycle until
    /// the window closes or a fatal error occurs.
    pub fn run<S>(config: RuntimeConfig, device_config: DeviceConfig, scene: S) -> Result<()>
    where
        S: Scene<WgpuBackend> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, device_config, scene);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct AppState<S>
where
    S: Scene<WgpuBackend> + 'static,
{
    config: RuntimeConfig,
    harness: Option<Harness<WgpuBackend, S>>,
    window: Option<Arc<Window>>,
    /// Last size handed to the harness; winit repeats unchanged sizes.
    applied_size: Option<PhysicalSize<u32>>,
    failure: Option<anyhow::Error>,
}

impl<S> AppState<S>
where
    S: Scene<WgpuBackend> + 'static,
{
    fn new(config: RuntimeConfig, device_config: DeviceConfig, scene: S) -> Self {
        let backend = WgpuBackend::new(config.backend.clone());
        Self {
            config,
            harness: Some(Harness::new(backend, device_config, scene)),
            window: None,
            applied_size: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure.get_or_insert(err);
        event_loop.exit();
    }

    fn fail_device(&mut self, event_loop: &ActiveEventLoop, err: DeviceError, what: &'static str) {
        self.fail(event_loop, anyhow::Error::new(err).context(what));
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let target = WindowTarget::new(window.clone()).context("window has no raw handle")?;
        let size = window.inner_size();
        let (width, height) = signed(size);

        if let Some(harness) = self.harness.as_mut() {
            harness
                .initialize(target, width, height, Rotation::Identity)
                .context("device initialization failed")?;
        }

        window.request_redraw();
        self.window = Some(window);
        self.applied_size = Some(size);
        Ok(())
    }

    fn apply_size(&mut self, event_loop: &ActiveEventLoop, size: PhysicalSize<u32>) {
        if self.applied_size == Some(size) {
            return;
        }
        let Some(harness) = self.harness.as_mut() else {
            return;
        };

        let (width, height) = signed(size);
        match harness.on_window_size_changed(width, height, Rotation::Identity) {
            Ok(()) => {
                self.applied_size = Some(size);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Err(e) => self.fail_device(event_loop, e, "resize failed"),
        }
    }
}

/// Host sizes arrive unsigned from winit; the harness takes signed input.
fn signed(size: PhysicalSize<u32>) -> (i32, i32) {
    (
        i32::try_from(size.width).unwrap_or(i32::MAX),
        i32::try_from(size.height).unwrap_or(i32::MAX),
    )
}

impl<S> ApplicationHandler for AppState<S>
where
    S: Scene<WgpuBackend> + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            if let Some(harness) = self.harness.as_mut() {
                harness.on_resuming();
            }
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(harness) = self.harness.as_mut() {
            harness.on_suspending();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        let Some(harness) = self.harness.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(new_size) => self.apply_size(event_loop, new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                // Moving between displays may also mean a different adapter.
                match harness.validate_device() {
                    Ok(_) => self.apply_size(event_loop, window.inner_size()),
                    Err(e) => self.fail_device(event_loop, e, "device validation failed"),
                }
            }

            WindowEvent::Focused(true) => harness.on_activated(),
            WindowEvent::Focused(false) => harness.on_deactivated(),

            WindowEvent::RedrawRequested => {
                window.pre_present_notify();
                match harness.tick() {
                    Ok(outcome) => log::trace!("frame: {outcome:?}"),
                    Err(e) => self.fail_device(event_loop, e, "frame failed"),
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Release the device while the window is still alive.
        self.harness = None;
        self.window = None;
    }
}
