use std::fmt;

use super::{
    ApiError, CapabilityLevel, ClearValues, DepthDesc, DiagnosticOptions, Extent, SurfaceDesc,
    WindowTarget,
};

/// Stable identity of the physical adapter behind a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterIdentity {
    pub vendor: u32,
    pub device: u32,
    pub backend: String,
    pub name: String,
}

impl fmt::Display for AdapterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:04x}:{:04x}, {})",
            self.name, self.vendor, self.device, self.backend
        )
    }
}

/// A freshly created device, its context, and the adapter it runs on.
pub struct CreatedDevice<B: Backend + ?Sized> {
    pub device: B::Device,
    pub context: B::Context,
    pub adapter: AdapterIdentity,
}

/// Native GPU calls used by the lifecycle components.
///
/// Objects are released by dropping them. Calls are synchronous; a backend
/// wrapping an async API blocks until the request resolves.
pub trait Backend {
    type Device;
    /// Command-submission interface bound 1:1 to a device.
    type Context;
    type Surface;
    type BackBuffer;
    type RenderTargetView;
    type DepthBuffer;
    type DepthStencilView;

    /// Creates a hardware device at exactly `level` on an adapter that can
    /// present to `window`.
    ///
    /// Returns [`ApiError::Unsupported`] when the adapter cannot provide the
    /// level or cannot present to the window, so the factory can try the next
    /// level.
    fn create_device(
        &mut self,
        level: CapabilityLevel,
        window: &WindowTarget,
        diagnostics: &DiagnosticOptions,
    ) -> Result<CreatedDevice<Self>, ApiError>;

    /// Enumerates the system's current default adapter.
    fn default_adapter(&mut self) -> Result<AdapterIdentity, ApiError>;

    /// The device's removal reason, if it has been removed.
    fn device_removed_reason(&self, device: &Self::Device) -> Option<String>;

    /// Creates a surface bound to `window` through the device's owning factory.
    fn create_surface(
        &mut self,
        device: &Self::Device,
        context: &Self::Context,
        window: &WindowTarget,
        desc: &SurfaceDesc,
    ) -> Result<Self::Surface, ApiError>;

    /// Resizes the surface buffers in place, keeping buffer count and format.
    ///
    /// Callers release every back buffer and view derived from the surface first.
    fn resize_surface(
        &mut self,
        device: &Self::Device,
        surface: &mut Self::Surface,
        extent: Extent,
    ) -> Result<(), ApiError>;

    /// Submits any pending work on the context.
    fn flush(&mut self, context: &Self::Context);

    fn acquire_back_buffer(
        &mut self,
        device: &Self::Device,
        surface: &mut Self::Surface,
    ) -> Result<Self::BackBuffer, ApiError>;

    fn create_render_target_view(
        &mut self,
        device: &Self::Device,
        back_buffer: &Self::BackBuffer,
    ) -> Result<Self::RenderTargetView, ApiError>;

    fn create_depth_buffer(
        &mut self,
        device: &Self::Device,
        desc: &DepthDesc,
    ) -> Result<Self::DepthBuffer, ApiError>;

    fn create_depth_stencil_view(
        &mut self,
        device: &Self::Device,
        depth_buffer: &Self::DepthBuffer,
    ) -> Result<Self::DepthStencilView, ApiError>;

    /// Clears both views and binds them as the frame's output.
    fn clear_views(
        &mut self,
        device: &Self::Device,
        context: &Self::Context,
        render_target: &Self::RenderTargetView,
        depth_stencil: &Self::DepthStencilView,
        clear: &ClearValues,
    );

    /// Presents `back_buffer`, consuming it.
    fn present(
        &mut self,
        device: &Self::Device,
        context: &Self::Context,
        surface: &mut Self::Surface,
        back_buffer: Self::BackBuffer,
    ) -> Result<(), ApiError>;
}
