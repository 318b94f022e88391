use crate::device::{
    Backend, DeviceConfig, DeviceError, Extent, Lifecycle, RenderOutcome, Rotation, WindowTarget,
};
use crate::time::StepTimer;

use super::app::Scene;

/// Preferred initial window size.
pub fn default_size() -> Extent {
    Extent::new(800, 600)
}

/// Host-facing entry points.
///
/// Wraps the lifecycle, one scene and the step timer. The windowing layer
/// forwards its events here; see `window::Runtime` for the winit mapping.
pub struct Harness<B: Backend, S: Scene<B>> {
    scene: S,
    lifecycle: Lifecycle<B>,
    timer: StepTimer,
    active: bool,
}

impl<B: Backend, S: Scene<B>> Harness<B, S> {
    pub fn new(backend: B, config: DeviceConfig, scene: S) -> Self {
        Self {
            scene,
            lifecycle: Lifecycle::new(backend, config),
            timer: StepTimer::new(),
            active: true,
        }
    }

    pub fn initialize(
        &mut self,
        window: WindowTarget,
        width: i32,
        height: i32,
        rotation: Rotation,
    ) -> Result<(), DeviceError> {
        self.lifecycle.initialize(
            &mut self.scene,
            window,
            Extent::clamped(width, height),
            rotation,
        )
    }

    /// Runs one simulation step, then renders.
    pub fn tick(&mut self) -> Result<RenderOutcome, DeviceError> {
        let time = self.timer.tick();
        self.scene.update(&time);
        self.render()
    }

    /// Renders without stepping the simulation.
    pub fn render(&mut self) -> Result<RenderOutcome, DeviceError> {
        self.lifecycle.render(&mut self.scene, &self.timer)
    }

    /// Rebuilds the window-size dependent resources, every call.
    pub fn on_window_size_changed(
        &mut self,
        width: i32,
        height: i32,
        rotation: Rotation,
    ) -> Result<(), DeviceError> {
        self.lifecycle
            .resize(&mut self.scene, Extent::clamped(width, height), rotation)
    }

    pub fn on_suspending(&mut self) {
        log::debug!("suspending");
        self.lifecycle.suspend();
    }

    pub fn on_resuming(&mut self) {
        log::debug!("resuming");
        self.timer.reset_elapsed();
    }

    pub fn on_activated(&mut self) {
        self.active = true;
    }

    pub fn on_deactivated(&mut self) {
        self.active = false;
    }

    /// Recovers if the device is no longer valid. Returns whether it did.
    pub fn validate_device(&mut self) -> Result<bool, DeviceError> {
        self.lifecycle.validate_device(&mut self.scene)
    }

    /// Whether the window currently has focus.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn lifecycle(&self) -> &Lifecycle<B> {
        &self.lifecycle
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn timer(&self) -> &StepTimer {
        &self.timer
    }
}

impl<B: Backend, S: Scene<B>> Drop for Harness<B, S> {
    fn drop(&mut self) {
        self.lifecycle.shutdown(&mut self.scene);
    }
}
