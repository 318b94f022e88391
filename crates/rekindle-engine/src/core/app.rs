use crate::device::Backend;
use crate::time::StepTime;

use super::ctx::{FrameCtx, GpuCtx};

/// Scene contract implemented by higher layers.
///
/// The lifecycle calls these in a fixed order per device generation:
/// `create_device_resources` once, `create_window_resources` after every
/// surface (re)build, `draw` per frame, and `release_device_resources` before
/// any device object is released.
pub trait Scene<B: Backend> {
    /// Called once per device generation, after the surface and views exist.
    fn create_device_resources(&mut self, gpu: &GpuCtx<'_, B>) {
        let _ = gpu;
    }

    /// Called whenever the surface has been created or resized.
    fn create_window_resources(&mut self, gpu: &GpuCtx<'_, B>) {
        let _ = gpu;
    }

    /// Drop every object created from the current device.
    fn release_device_resources(&mut self) {}

    /// Advances the simulation by one step.
    fn update(&mut self, time: &StepTime) {
        let _ = time;
    }

    /// Records the frame. Both views are cleared and bound when this runs.
    fn draw(&mut self, frame: &mut FrameCtx<'_, B>);
}
