use crate::device::{Backend, CapabilityLevel, DepthFormat, Extent, Generation, Rotation};

/// Handles of the current device generation, lent to the scene.
///
/// Everything here is only valid for the duration of the callback; keep
/// [`generation`](Self::generation) if you need to notice a new device later.
pub struct GpuCtx<'a, B: Backend> {
    pub device:       &'a B::Device,
    pub context:      &'a B::Context,
    pub surface:      &'a B::Surface,
    pub extent:       Extent,
    pub rotation:     Rotation,
    pub level:        CapabilityLevel,
    pub generation:   Generation,
    pub depth_format: DepthFormat,
}

impl<B: Backend> GpuCtx<'_, B> {
    /// Width over height of the output.
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height as f32
    }
}

/// Per-frame context passed to `core::Scene::draw`.
pub struct FrameCtx<'a, B: Backend> {
    pub gpu:           GpuCtx<'a, B>,
    pub render_target: &'a B::RenderTargetView,
    pub depth_stencil: &'a B::DepthStencilView,

    /// Simulation steps taken so far (at least 1 when drawing).
    pub frame_count:   u64,
}
