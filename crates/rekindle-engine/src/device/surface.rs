use super::{
    ApiError, Backend, DepthDesc, DepthFormat, DeviceConfig, DeviceError, DeviceGeneration, Extent,
    Generation, PresentOutcome, SurfaceDesc, Tagged, WindowTarget,
};

/// Render-target view over the current back buffer.
///
/// The view is declared first so it drops before the buffer it references.
pub struct RenderTarget<B: Backend> {
    view: B::RenderTargetView,
    back_buffer: B::BackBuffer,
}

/// Depth/stencil view plus its backing buffer.
pub struct DepthTarget<B: Backend> {
    view: B::DepthStencilView,
    buffer: B::DepthBuffer,
}

/// Owns the presentation surface and the views derived from it.
///
/// Resizing is only reachable after every derived view has been released and
/// the context flushed; see [`create_or_resize`](Self::create_or_resize).
pub struct SurfaceManager<B: Backend> {
    desc: SurfaceDesc,
    depth_format: DepthFormat,

    render_target: Option<Tagged<RenderTarget<B>>>,
    depth: Option<Tagged<DepthTarget<B>>>,
    surface: Option<Tagged<B::Surface>>,
}

impl<B: Backend> SurfaceManager<B> {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            desc: SurfaceDesc {
                extent: Extent::new(1, 1),
                format: config.back_buffer_format,
                buffer_count: config.buffer_count.max(2),
                vsync: config.vsync,
            },
            depth_format: config.depth_format,
            render_target: None,
            depth: None,
            surface: None,
        }
    }

    /// Current surface description (extent reflects the last create/resize).
    pub fn desc(&self) -> &SurfaceDesc {
        &self.desc
    }

    pub fn extent(&self) -> Extent {
        self.desc.extent
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self, generation: Generation) -> Option<&B::Surface> {
        self.surface.as_ref().map(|s| s.get(generation))
    }

    /// Both derived views, if they are currently bound-ready.
    pub fn views(
        &self,
        generation: Generation,
    ) -> Option<(&B::RenderTargetView, &B::DepthStencilView)> {
        let render_target = self.render_target.as_ref()?.get(generation);
        let depth = self.depth.as_ref()?.get(generation);
        Some((&render_target.view, &depth.view))
    }

    /// Creates the surface, or resizes the existing one in place.
    ///
    /// Derived views are released and the context flushed before the surface
    /// is touched. A removal/reset reported here comes back as
    /// [`DeviceError::SurfaceLost`].
    pub fn create_or_resize(
        &mut self,
        backend: &mut B,
        device: &DeviceGeneration<B>,
        window: &WindowTarget,
        extent: Extent,
    ) -> Result<(), DeviceError> {
        self.release_views();
        backend.flush(device.context());

        self.desc.extent = extent;

        match self.surface.as_mut() {
            Some(surface) => {
                let surface = surface.get_mut(device.generation());
                backend
                    .resize_surface(device.device(), surface, extent)
                    .map_err(|e| DeviceError::from_surface_call("resize_surface", e))?;
                log::debug!("resized surface to {}x{}", extent.width, extent.height);
            }
            None => {
                let surface = backend
                    .create_surface(device.device(), device.context(), window, &self.desc)
                    .map_err(|e| DeviceError::from_surface_call("create_surface", e))?;
                self.surface = Some(Tagged::new(device.generation(), surface));
                log::debug!(
                    "created {:?} surface {}x{} ({} buffers)",
                    window.kind(),
                    extent.width,
                    extent.height,
                    self.desc.buffer_count
                );
            }
        }

        Ok(())
    }

    /// Creates the render-target view over the current back buffer and a
    /// matching depth/stencil buffer and view.
    pub fn create_views(
        &mut self,
        backend: &mut B,
        device: &DeviceGeneration<B>,
    ) -> Result<(), DeviceError> {
        if !self.ensure_render_target(backend, device)? {
            log::debug!("no back buffer available yet; render target deferred to first frame");
        }

        let depth_desc = DepthDesc {
            extent: self.desc.extent,
            format: self.depth_format,
        };
        let buffer = backend
            .create_depth_buffer(device.device(), &depth_desc)
            .map_err(|e| DeviceError::from_surface_call("create_depth_buffer", e))?;
        let view = backend
            .create_depth_stencil_view(device.device(), &buffer)
            .map_err(|e| DeviceError::from_surface_call("create_depth_stencil_view", e))?;

        self.depth = Some(Tagged::new(device.generation(), DepthTarget { view, buffer }));
        Ok(())
    }

    /// Makes sure a render-target view exists, acquiring a back buffer if needed.
    ///
    /// Returns `Ok(false)` when the acquire timed out.
    pub fn ensure_render_target(
        &mut self,
        backend: &mut B,
        device: &DeviceGeneration<B>,
    ) -> Result<bool, DeviceError> {
        if self.render_target.is_some() {
            return Ok(true);
        }

        let Some(surface) = self.surface.as_mut() else {
            return Err(DeviceError::TransientApiFailure {
                op: "acquire_back_buffer",
                source: ApiError::other("no presentation surface"),
            });
        };

        let back_buffer =
            match backend.acquire_back_buffer(device.device(), surface.get_mut(device.generation())) {
                Ok(buffer) => buffer,
                Err(ApiError::Timeout) => return Ok(false),
                Err(e) => return Err(DeviceError::from_surface_call("acquire_back_buffer", e)),
            };

        let view = backend
            .create_render_target_view(device.device(), &back_buffer)
            .map_err(|e| DeviceError::from_surface_call("create_render_target_view", e))?;

        self.render_target = Some(Tagged::new(
            device.generation(),
            RenderTarget { view, back_buffer },
        ));
        Ok(true)
    }

    /// Presents the current back buffer, then binds a view over the next one.
    ///
    /// Removal/reset is reported as [`PresentOutcome::DeviceLost`]; any other
    /// failure is fatal.
    pub fn present(
        &mut self,
        backend: &mut B,
        device: &DeviceGeneration<B>,
    ) -> Result<PresentOutcome, DeviceError> {
        let Some(target) = self.render_target.take() else {
            return Ok(PresentOutcome::Skipped);
        };
        let Some(surface) = self.surface.as_mut() else {
            return Err(DeviceError::TransientApiFailure {
                op: "present",
                source: ApiError::other("no presentation surface"),
            });
        };

        let RenderTarget { view, back_buffer } = target.into_inner();
        drop(view);

        match backend.present(
            device.device(),
            device.context(),
            surface.get_mut(device.generation()),
            back_buffer,
        ) {
            Ok(()) => {}
            Err(e) if e.is_device_loss() => return Ok(PresentOutcome::DeviceLost),
            Err(e) => return Err(DeviceError::TransientApiFailure { op: "present", source: e }),
        }

        match self.ensure_render_target(backend, device) {
            Ok(_) => Ok(PresentOutcome::Presented),
            Err(e) if e.is_loss() => Ok(PresentOutcome::DeviceLost),
            Err(e) => Err(e),
        }
    }

    /// Releases the render-target view, the depth/stencil view, the depth
    /// buffer, and the back buffer, in that order. Tolerates nothing being held.
    pub fn release_views(&mut self) {
        let render_target = self.render_target.take().map(Tagged::into_inner);
        let depth = self.depth.take().map(Tagged::into_inner);

        let (rtv, back_buffer) = match render_target {
            Some(RenderTarget { view, back_buffer }) => (Some(view), Some(back_buffer)),
            None => (None, None),
        };
        let (dsv, depth_buffer) = match depth {
            Some(DepthTarget { view, buffer }) => (Some(view), Some(buffer)),
            None => (None, None),
        };

        drop(rtv);
        drop(dsv);
        drop(depth_buffer);
        drop(back_buffer);
    }

    /// Releases the views, then the surface itself.
    pub fn release_all(&mut self) {
        self.release_views();
        self.surface = None;
    }
}

impl<B: Backend> Drop for SurfaceManager<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::factory::create_device;
    use crate::device::sim::{ObjectKind, SimBackend, SimEvent, SimWindow};

    struct Fixture {
        sim: SimBackend,
        device: DeviceGeneration<SimBackend>,
        surfaces: SurfaceManager<SimBackend>,
        window: WindowTarget,
    }

    fn fixture() -> Fixture {
        let mut sim = SimBackend::new();
        let config = DeviceConfig::default();
        let window = WindowTarget::new(Arc::new(SimWindow::win32())).unwrap();
        let device = create_device(&mut sim, &config, &window, Generation::NONE.next()).unwrap();
        Fixture {
            sim,
            device,
            surfaces: SurfaceManager::new(&config),
            window,
        }
    }

    fn build(f: &mut Fixture, extent: Extent) -> Result<(), DeviceError> {
        f.surfaces.create_or_resize(&mut f.sim, &f.device, &f.window, extent)?;
        f.surfaces.create_views(&mut f.sim, &f.device)
    }

    #[test]
    fn first_call_creates_then_later_calls_resize() {
        let mut f = fixture();
        build(&mut f, Extent::new(640, 480)).unwrap();
        build(&mut f, Extent::new(800, 600)).unwrap();

        let created = f
            .sim
            .events()
            .iter()
            .filter(|e| matches!(e, SimEvent::Created { kind: ObjectKind::Surface, .. }))
            .count();
        assert_eq!(created, 1);
        assert_eq!(f.sim.surface_extent(), Some(Extent::new(800, 600)));
        assert_eq!(f.sim.depth_extent(), Some(Extent::new(800, 600)));
    }

    #[test]
    fn views_are_released_and_context_flushed_before_resize() {
        let mut f = fixture();
        build(&mut f, Extent::new(640, 480)).unwrap();
        f.sim.clear_events();

        build(&mut f, Extent::new(1024, 768)).unwrap();

        let events = f.sim.events();
        let resized = events
            .iter()
            .position(|e| matches!(e, SimEvent::SurfaceResized { .. }))
            .unwrap();
        let flushed = events.iter().position(|e| *e == SimEvent::Flushed).unwrap();
        let last_release = events
            .iter()
            .rposition(|e| {
                matches!(
                    e,
                    SimEvent::Released {
                        kind: ObjectKind::RenderTargetView
                            | ObjectKind::DepthStencilView
                            | ObjectKind::DepthBuffer
                            | ObjectKind::BackBuffer,
                        ..
                    }
                )
            })
            .unwrap();
        assert!(last_release < flushed);
        assert!(flushed < resized);
    }

    #[test]
    fn release_views_follows_dependency_order() {
        let mut f = fixture();
        build(&mut f, Extent::new(64, 64)).unwrap();
        f.sim.clear_events();

        f.surfaces.release_all();

        let kinds: Vec<ObjectKind> = f
            .sim
            .events()
            .iter()
            .filter_map(|e| match e {
                SimEvent::Released { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ObjectKind::RenderTargetView,
                ObjectKind::DepthStencilView,
                ObjectKind::DepthBuffer,
                ObjectKind::BackBuffer,
                ObjectKind::Surface,
            ]
        );
        assert!(!f.surfaces.has_surface());
    }

    #[test]
    fn release_is_idempotent() {
        let mut f = fixture();
        f.surfaces.release_all();
        f.surfaces.release_all();
        assert!(f.sim.events().iter().all(|e| !matches!(e, SimEvent::Released { .. })));
    }

    #[test]
    fn resize_loss_is_reported_as_surface_lost() {
        let mut f = fixture();
        build(&mut f, Extent::new(64, 64)).unwrap();
        f.sim.fail_next_resize(ApiError::DeviceRemoved);

        let err = build(&mut f, Extent::new(128, 128)).unwrap_err();
        assert!(matches!(err, DeviceError::SurfaceLost { op: "resize_surface" }));
    }

    #[test]
    fn present_rebinds_a_view_over_the_next_back_buffer() {
        let mut f = fixture();
        build(&mut f, Extent::new(64, 64)).unwrap();

        let outcome = f.surfaces.present(&mut f.sim, &f.device).unwrap();

        assert_eq!(outcome, PresentOutcome::Presented);
        assert!(f.surfaces.views(f.device.generation()).is_some());
        assert_eq!(f.sim.live(ObjectKind::RenderTargetView), 1);
        assert_eq!(f.sim.live(ObjectKind::BackBuffer), 1);
    }

    #[test]
    fn present_removal_reports_device_lost() {
        let mut f = fixture();
        build(&mut f, Extent::new(64, 64)).unwrap();
        f.sim.fail_next_present(ApiError::DeviceReset);

        let outcome = f.surfaces.present(&mut f.sim, &f.device).unwrap();
        assert_eq!(outcome, PresentOutcome::DeviceLost);
    }

    #[test]
    fn present_other_failure_is_fatal() {
        let mut f = fixture();
        build(&mut f, Extent::new(64, 64)).unwrap();
        f.sim.fail_next_present(ApiError::other("invalid call"));

        let err = f.surfaces.present(&mut f.sim, &f.device).unwrap_err();
        assert!(matches!(err, DeviceError::TransientApiFailure { op: "present", .. }));
    }

    #[test]
    fn acquire_timeout_defers_the_render_target() {
        let mut f = fixture();
        f.sim.fail_next_acquire(ApiError::Timeout);
        build(&mut f, Extent::new(64, 64)).unwrap();

        assert!(f.surfaces.views(f.device.generation()).is_none());
        assert!(f.surfaces.ensure_render_target(&mut f.sim, &f.device).unwrap());
        assert!(f.surfaces.views(f.device.generation()).is_some());
    }
}
