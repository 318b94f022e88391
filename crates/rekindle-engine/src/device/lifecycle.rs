use crate::core::{FrameCtx, GpuCtx, Scene};
use crate::time::StepTimer;

use super::factory::{self, DeviceGeneration};
use super::loss;
use super::surface::SurfaceManager;
use super::{
    AdapterIdentity, ApiError, Backend, CapabilityLevel, ClearValues, DeviceConfig, DeviceError,
    Extent, Generation, PresentOutcome, Rotation, WindowTarget,
};

/// Orchestrator states.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    DeviceReady,
    SurfaceReady,
    Running,
    /// Tearing down a lost generation and bringing up the next one.
    Recovering,
}

/// What a call to [`Lifecycle::render`] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderOutcome {
    /// No simulation step has been taken yet; no GPU calls were made.
    NotStepped,
    Presented,
    /// No back buffer was available in time; nothing was presented.
    Skipped,
    /// The device was lost during the frame and a new generation is running.
    Recovered,
}

/// Owns the device generation and everything created from it.
///
/// Field order is release order: views and surface, then context and device,
/// then the backend itself.
pub struct Lifecycle<B: Backend> {
    surfaces: SurfaceManager<B>,
    device: Option<DeviceGeneration<B>>,

    state: LifecycleState,
    config: DeviceConfig,
    clear: ClearValues,
    window: Option<WindowTarget>,
    extent: Extent,
    rotation: Rotation,
    generation: Generation,

    backend: B,
}

impl<B: Backend> Lifecycle<B> {
    pub fn new(backend: B, config: DeviceConfig) -> Self {
        Self {
            surfaces: SurfaceManager::new(&config),
            device: None,
            state: LifecycleState::Uninitialized,
            clear: ClearValues::for_config(&config),
            config,
            window: None,
            extent: Extent::new(1, 1),
            rotation: Rotation::Identity,
            generation: Generation::NONE,
            backend,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Output size used for the surface and views.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Generation of the current device, if any.
    pub fn generation(&self) -> Option<Generation> {
        self.device.as_ref().map(DeviceGeneration::generation)
    }

    pub fn capability_level(&self) -> Option<CapabilityLevel> {
        self.device.as_ref().map(DeviceGeneration::level)
    }

    pub fn adapter(&self) -> Option<&AdapterIdentity> {
        self.device.as_ref().map(DeviceGeneration::adapter)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Handles of the current generation, once a surface exists.
    pub fn gpu(&self) -> Option<GpuCtx<'_, B>> {
        let device = self.device.as_ref()?;
        let surface = self.surfaces.surface(device.generation())?;
        Some(GpuCtx {
            device: device.device(),
            context: device.context(),
            surface,
            extent: self.extent,
            rotation: self.rotation,
            level: device.level(),
            generation: device.generation(),
            depth_format: self.config.depth_format,
        })
    }

    fn expect_state(&self, op: &'static str, allowed: &[LifecycleState]) -> Result<(), DeviceError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DeviceError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    /// Creates the device, the surface, and its views, then hands the scene
    /// the new handles.
    ///
    /// On failure everything created so far is released and the orchestrator
    /// stays `Uninitialized`.
    pub fn initialize<S: Scene<B>>(
        &mut self,
        scene: &mut S,
        window: WindowTarget,
        extent: Extent,
        rotation: Rotation,
    ) -> Result<(), DeviceError> {
        self.expect_state("initialize", &[LifecycleState::Uninitialized])?;

        self.window = Some(window);
        self.extent = extent;
        self.rotation = rotation;

        self.bring_up(scene)
    }

    fn bring_up<S: Scene<B>>(&mut self, scene: &mut S) -> Result<(), DeviceError> {
        if let Err(err) = self.try_bring_up(scene) {
            log::warn!("bring-up failed: {err}");
            self.release_generation();
            self.state = LifecycleState::Uninitialized;
            return Err(err.into_fatal());
        }

        log::info!(
            "running on {} at {}x{}",
            self.generation,
            self.extent.width,
            self.extent.height
        );
        Ok(())
    }

    fn try_bring_up<S: Scene<B>>(&mut self, scene: &mut S) -> Result<(), DeviceError> {
        let Some(window) = self.window.as_ref() else {
            return Err(DeviceError::InvalidState {
                op: "bring_up",
                state: self.state,
            });
        };

        let generation = self.generation.next();
        let device = factory::create_device(&mut self.backend, &self.config, window, generation)?;
        self.generation = generation;
        self.device = Some(device);
        self.state = LifecycleState::DeviceReady;

        self.build_window_resources(scene, true)
    }

    fn build_window_resources<S: Scene<B>>(
        &mut self,
        scene: &mut S,
        new_device: bool,
    ) -> Result<(), DeviceError> {
        let (Some(device), Some(window)) = (self.device.as_ref(), self.window.as_ref()) else {
            return Err(DeviceError::InvalidState {
                op: "build_window_resources",
                state: self.state,
            });
        };

        self.surfaces
            .create_or_resize(&mut self.backend, device, window, self.extent)?;
        self.surfaces.create_views(&mut self.backend, device)?;
        self.state = LifecycleState::SurfaceReady;

        if let Some(gpu) = self.gpu() {
            if new_device {
                scene.create_device_resources(&gpu);
            }
            scene.create_window_resources(&gpu);
        }

        self.state = LifecycleState::Running;
        Ok(())
    }

    /// Resizes the surface and rebuilds its views, even when the size is
    /// unchanged.
    ///
    /// A loss reported by the resize runs full recovery instead of failing.
    /// Any other failure releases the generation and leaves the orchestrator
    /// `Uninitialized`.
    pub fn resize<S: Scene<B>>(
        &mut self,
        scene: &mut S,
        extent: Extent,
        rotation: Rotation,
    ) -> Result<(), DeviceError> {
        self.expect_state(
            "resize",
            &[LifecycleState::SurfaceReady, LifecycleState::Running],
        )?;

        self.extent = extent;
        self.rotation = rotation;

        match self.build_window_resources(scene, false) {
            Ok(()) => Ok(()),
            Err(err) if err.is_loss() => self.recover(scene, err),
            Err(err) => Err(self.abandon(scene, err)),
        }
    }

    fn recover<S: Scene<B>>(
        &mut self,
        scene: &mut S,
        cause: DeviceError,
    ) -> Result<(), DeviceError> {
        log::warn!("{cause}");
        self.on_device_lost(scene)
    }

    /// Releases the generation after a fatal failure and returns the failure.
    fn abandon<S: Scene<B>>(&mut self, scene: &mut S, err: DeviceError) -> DeviceError {
        log::error!("{err}; releasing device {}", self.generation);
        scene.release_device_resources();
        self.release_generation();
        self.state = LifecycleState::Uninitialized;
        err
    }

    /// Releases the whole generation and brings up a new one with the stored
    /// window and size.
    ///
    /// If the new bring-up fails, the error is returned and the orchestrator
    /// is left `Uninitialized`.
    pub fn on_device_lost<S: Scene<B>>(&mut self, scene: &mut S) -> Result<(), DeviceError> {
        self.expect_state(
            "on_device_lost",
            &[
                LifecycleState::DeviceReady,
                LifecycleState::SurfaceReady,
                LifecycleState::Running,
            ],
        )?;

        log::warn!("device {} lost; recovering", self.generation);
        self.state = LifecycleState::Recovering;

        scene.release_device_resources();
        self.release_generation();

        self.bring_up(scene)
    }

    /// Releases views, depth buffer, surface, context and device, in that order.
    fn release_generation(&mut self) {
        self.surfaces.release_all();
        if let Some(device) = self.device.take() {
            device.release();
        }
    }

    /// Clears and binds the views, lets the scene draw, then presents.
    ///
    /// A loss runs full recovery. Any other failure releases the generation
    /// and leaves the orchestrator `Uninitialized`.
    pub fn render<S: Scene<B>>(
        &mut self,
        scene: &mut S,
        timer: &StepTimer,
    ) -> Result<RenderOutcome, DeviceError> {
        self.expect_state("render", &[LifecycleState::Running])?;

        if timer.frame_count() == 0 {
            return Ok(RenderOutcome::NotStepped);
        }

        let Some(device) = self.device.as_ref() else {
            return Err(DeviceError::InvalidState {
                op: "render",
                state: self.state,
            });
        };

        match self.surfaces.ensure_render_target(&mut self.backend, device) {
            Ok(true) => {}
            Ok(false) => return Ok(RenderOutcome::Skipped),
            Err(err) if err.is_loss() => {
                self.recover(scene, err)?;
                return Ok(RenderOutcome::Recovered);
            }
            Err(err) => return Err(self.abandon(scene, err)),
        }

        let views = self.surfaces.views(device.generation());
        let Some((render_target, depth_stencil)) = views else {
            let err = DeviceError::TransientApiFailure {
                op: "render",
                source: ApiError::other("render-target or depth/stencil view missing"),
            };
            return Err(self.abandon(scene, err));
        };

        self.backend.clear_views(
            device.device(),
            device.context(),
            render_target,
            depth_stencil,
            &self.clear,
        );

        if let Some(gpu) = self.gpu() {
            let mut frame = FrameCtx {
                gpu,
                render_target,
                depth_stencil,
                frame_count: timer.frame_count(),
            };
            scene.draw(&mut frame);
        }

        let Some(device) = self.device.as_ref() else {
            return Err(DeviceError::InvalidState {
                op: "present",
                state: self.state,
            });
        };

        match self.surfaces.present(&mut self.backend, device) {
            Ok(PresentOutcome::Presented) => Ok(RenderOutcome::Presented),
            Ok(PresentOutcome::Skipped) => Ok(RenderOutcome::Skipped),
            Ok(PresentOutcome::DeviceLost) => {
                self.recover(scene, DeviceError::DeviceLost { op: "present" })?;
                Ok(RenderOutcome::Recovered)
            }
            Err(err) => Err(self.abandon(scene, err)),
        }
    }

    /// Checks the device against the current default adapter; recovers if it
    /// is no longer valid.
    ///
    /// Returns whether recovery happened.
    pub fn validate_device<S: Scene<B>>(&mut self, scene: &mut S) -> Result<bool, DeviceError> {
        self.expect_state(
            "validate_device",
            &[
                LifecycleState::DeviceReady,
                LifecycleState::SurfaceReady,
                LifecycleState::Running,
            ],
        )?;

        let Some(device) = self.device.as_ref() else {
            return Ok(false);
        };
        if loss::is_device_still_valid(&mut self.backend, device.device(), device.adapter()) {
            return Ok(false);
        }

        self.recover(scene, DeviceError::DeviceLost { op: "validate_device" })?;
        Ok(true)
    }

    /// Flushes pending work so the driver can reclaim transient memory.
    pub fn suspend(&mut self) {
        if let Some(device) = self.device.as_ref() {
            self.backend.flush(device.context());
            log::debug!("flushed {} for suspension", device.generation());
        }
    }

    /// Tells the scene to release its objects, then releases the generation.
    pub fn shutdown<S: Scene<B>>(&mut self, scene: &mut S) {
        if self.device.is_none() {
            return;
        }

        scene.release_device_resources();
        if let Some(device) = self.device.as_ref() {
            self.backend.flush(device.context());
        }
        self.release_generation();
        self.state = LifecycleState::Uninitialized;
        log::info!("device lifecycle shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::{ObjectKind, SimBackend, SimEvent, SimWindow};
    use crate::device::ApiError;

    #[derive(Default)]
    struct CountingScene {
        device_resources: u32,
        window_resources: u32,
        released: u32,
        draws: u32,
    }

    impl Scene<SimBackend> for CountingScene {
        fn create_device_resources(&mut self, _gpu: &GpuCtx<'_, SimBackend>) {
            self.device_resources += 1;
        }

        fn create_window_resources(&mut self, _gpu: &GpuCtx<'_, SimBackend>) {
            self.window_resources += 1;
        }

        fn release_device_resources(&mut self) {
            self.released += 1;
        }

        fn draw(&mut self, frame: &mut FrameCtx<'_, SimBackend>) {
            assert_eq!(frame.render_target.kind(), ObjectKind::RenderTargetView);
            self.draws += 1;
        }
    }

    fn running() -> (SimBackend, Lifecycle<SimBackend>, CountingScene) {
        let sim = SimBackend::new();
        let mut lifecycle = Lifecycle::new(sim.clone(), DeviceConfig::default());
        let mut scene = CountingScene::default();
        lifecycle
            .initialize(
                &mut scene,
                SimWindow::win32().target(),
                Extent::new(320, 240),
                Rotation::Identity,
            )
            .unwrap();
        (sim, lifecycle, scene)
    }

    fn stepped() -> StepTimer {
        let mut timer = StepTimer::new();
        timer.tick();
        timer
    }

    #[test]
    fn initialize_reaches_running_and_notifies_the_scene() {
        let (sim, lifecycle, scene) = running();

        assert_eq!(lifecycle.state(), LifecycleState::Running);
        assert_eq!(lifecycle.generation().map(Generation::get), Some(1));
        assert_eq!(scene.device_resources, 1);
        assert_eq!(scene.window_resources, 1);
        assert_eq!(sim.live(ObjectKind::RenderTargetView), 1);
        assert_eq!(sim.live(ObjectKind::DepthStencilView), 1);
    }

    #[test]
    fn initialize_twice_is_invalid() {
        let (_sim, mut lifecycle, mut scene) = running();
        let err = lifecycle
            .initialize(
                &mut scene,
                SimWindow::win32().target(),
                Extent::new(1, 1),
                Rotation::Identity,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DeviceError::InvalidState {
                op: "initialize",
                state: LifecycleState::Running
            }
        ));
    }

    #[test]
    fn render_before_initialize_is_invalid() {
        let sim = SimBackend::new();
        let mut lifecycle = Lifecycle::new(sim, DeviceConfig::default());
        let err = lifecycle
            .render(&mut CountingScene::default(), &stepped())
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidState { op: "render", .. }));
    }

    #[test]
    fn resize_rebuilds_window_resources_only() {
        let (_sim, mut lifecycle, mut scene) = running();

        lifecycle
            .resize(&mut scene, Extent::new(640, 480), Rotation::Rotate90)
            .unwrap();
        lifecycle
            .resize(&mut scene, Extent::new(640, 480), Rotation::Rotate90)
            .unwrap();

        assert_eq!(scene.device_resources, 1);
        assert_eq!(scene.window_resources, 3);
        assert_eq!(lifecycle.rotation(), Rotation::Rotate90);
        assert_eq!(lifecycle.generation().map(Generation::get), Some(1));
    }

    #[test]
    fn render_draws_and_presents() {
        let (sim, mut lifecycle, mut scene) = running();
        let outcome = lifecycle.render(&mut scene, &stepped()).unwrap();

        assert_eq!(outcome, RenderOutcome::Presented);
        assert_eq!(scene.draws, 1);
        assert!(sim
            .events()
            .iter()
            .any(|e| matches!(e, SimEvent::Presented { .. })));
    }

    #[test]
    fn present_failure_that_is_not_a_loss_is_fatal() {
        let (sim, mut lifecycle, mut scene) = running();
        sim.fail_next_present(ApiError::other("invalid call"));

        let err = lifecycle.render(&mut scene, &stepped()).unwrap_err();

        assert!(!err.is_loss());
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(scene.released, 1);
        assert_eq!(sim.live_total(), 0);
    }

    #[test]
    fn fatal_resize_releases_the_generation() {
        let (sim, mut lifecycle, mut scene) = running();
        sim.fail_next_resize(ApiError::other("bad size"));

        let err = lifecycle
            .resize(&mut scene, Extent::new(100, 100), Rotation::Identity)
            .unwrap_err();

        assert!(matches!(
            err,
            DeviceError::TransientApiFailure { op: "resize_surface", .. }
        ));
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(lifecycle.generation(), None);
        assert_eq!(scene.released, 1);
        assert_eq!(sim.live_total(), 0);

        sim.clear_events();
        let err = lifecycle.render(&mut scene, &stepped()).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidState { op: "render", .. }));
        assert_eq!(scene.draws, 0);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn acquire_failure_that_is_not_a_loss_is_fatal() {
        let (sim, mut lifecycle, mut scene) = running();
        // Fails the re-acquire that follows the present.
        sim.fail_next_acquire(ApiError::other("swap chain broken"));

        let err = lifecycle.render(&mut scene, &stepped()).unwrap_err();

        assert!(matches!(
            err,
            DeviceError::TransientApiFailure { op: "acquire_back_buffer", .. }
        ));
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(sim.live_total(), 0);
    }

    #[test]
    fn failed_recovery_is_not_retried() {
        let (sim, mut lifecycle, mut scene) = running();
        sim.remove_device("hung");
        sim.fail_next_device_creation(ApiError::other("driver gone"));

        let err = lifecycle.render(&mut scene, &stepped()).unwrap_err();

        assert!(matches!(err, DeviceError::DeviceCreationFailed { .. }));
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(sim.live_total(), 0);
        assert_eq!(scene.released, 1);
    }

    #[test]
    fn suspend_flushes_without_changing_state() {
        let (sim, mut lifecycle, _scene) = running();
        sim.clear_events();

        lifecycle.suspend();

        assert_eq!(sim.events(), vec![SimEvent::Flushed]);
        assert_eq!(lifecycle.state(), LifecycleState::Running);
    }

    #[test]
    fn shutdown_releases_everything() {
        let (sim, mut lifecycle, mut scene) = running();
        lifecycle.shutdown(&mut scene);

        assert_eq!(scene.released, 1);
        assert_eq!(sim.live_total(), 0);
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
    }
}
