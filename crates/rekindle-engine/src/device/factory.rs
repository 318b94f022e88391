use super::caps;
use super::{
    AdapterIdentity, ApiError, Backend, CapabilityLevel, DeviceConfig, DeviceError, Generation,
    WindowTarget,
};

/// Device and context of one generation.
///
/// Fields drop in declaration order: the context goes before the device.
pub struct DeviceGeneration<B: Backend> {
    context: B::Context,
    device: B::Device,
    level: CapabilityLevel,
    adapter: AdapterIdentity,
    generation: Generation,
}

impl<B: Backend> DeviceGeneration<B> {
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn context(&self) -> &B::Context {
        &self.context
    }

    /// The granted capability level.
    pub fn level(&self) -> CapabilityLevel {
        self.level
    }

    /// Adapter identity captured when the device was created.
    pub fn adapter(&self) -> &AdapterIdentity {
        &self.adapter
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Releases the context, then the device.
    pub(crate) fn release(self) {
        let Self {
            context,
            device,
            generation,
            ..
        } = self;
        drop(context);
        drop(device);
        log::debug!("released device {generation}");
    }
}

/// Creates the device for `generation`, negotiating the capability level.
///
/// Levels are tried in configured order; the first one the backend accepts
/// (on an adapter able to present to `window`) is granted. A backend rejection
/// other than "unsupported" aborts immediately.
pub fn create_device<B: Backend>(
    backend: &mut B,
    config: &DeviceConfig,
    window: &WindowTarget,
    generation: Generation,
) -> Result<DeviceGeneration<B>, DeviceError> {
    let levels = &config.capability_levels;
    caps::validate_preferences(levels)
        .map_err(|reason| DeviceError::DeviceCreationFailed { reason })?;

    if config.diagnostics.enabled {
        log::debug!(
            "creating device with diagnostics ({} suppressed message pattern(s))",
            config.diagnostics.suppressed_messages.len()
        );
    }

    for &level in levels {
        match backend.create_device(level, window, &config.diagnostics) {
            Ok(created) => {
                log::info!(
                    "created device {generation} at capability level `{level}` on {}",
                    created.adapter
                );
                return Ok(DeviceGeneration {
                    context: created.context,
                    device: created.device,
                    level,
                    adapter: created.adapter,
                    generation,
                });
            }
            Err(ApiError::Unsupported(why)) => {
                log::debug!("capability level `{level}` rejected: {why}");
            }
            Err(err) => {
                return Err(DeviceError::DeviceCreationFailed {
                    reason: format!("level `{level}`: {err}"),
                });
            }
        }
    }

    let tried: Vec<&str> = levels.iter().map(|l| l.name()).collect();
    Err(DeviceError::DeviceCreationFailed {
        reason: format!("no supported capability level among [{}]", tried.join(", ")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::{ObjectKind, SimBackend, SimEvent, SimWindow};

    fn create(
        sim: &mut SimBackend,
        levels: &[CapabilityLevel],
    ) -> Result<DeviceGeneration<SimBackend>, DeviceError> {
        let config = DeviceConfig {
            capability_levels: levels.to_vec(),
            ..DeviceConfig::default()
        };
        create_device(sim, &config, &SimWindow::win32().target(), Generation::NONE.next())
    }

    #[test]
    fn grants_the_first_accepted_level() {
        let mut sim = SimBackend::new();
        sim.accept_only(&[CapabilityLevel::Downlevel]);

        let device = create(&mut sim, &CapabilityLevel::ALL).unwrap();

        assert_eq!(device.level(), CapabilityLevel::Downlevel);
        assert_eq!(device.generation().get(), 1);
        assert!(sim.events().contains(&SimEvent::LevelRejected(CapabilityLevel::Full)));
        assert!(!sim.events().contains(&SimEvent::LevelRejected(CapabilityLevel::WebGl2)));
    }

    #[test]
    fn prefers_the_highest_listed_level() {
        let mut sim = SimBackend::new();
        let device = create(&mut sim, &CapabilityLevel::ALL).unwrap();
        assert_eq!(device.level(), CapabilityLevel::Full);
    }

    #[test]
    fn skips_a_level_whose_adapter_cannot_present() {
        let mut sim = SimBackend::new();
        sim.cannot_present_at(&[CapabilityLevel::Full]);

        let device = create(&mut sim, &CapabilityLevel::ALL).unwrap();

        assert_eq!(device.level(), CapabilityLevel::Downlevel);
        assert!(sim.events().contains(&SimEvent::LevelRejected(CapabilityLevel::Full)));
        assert_eq!(sim.live(ObjectKind::Device), 1);
    }

    #[test]
    fn never_falls_back_past_the_list() {
        let mut sim = SimBackend::new();
        sim.accept_only(&[CapabilityLevel::WebGl2]);

        let result = create(&mut sim, &[CapabilityLevel::Full, CapabilityLevel::Downlevel]);

        assert!(matches!(result, Err(DeviceError::DeviceCreationFailed { .. })));
        assert_eq!(sim.live(ObjectKind::Device), 0);
    }

    #[test]
    fn hard_failure_does_not_try_lower_levels() {
        let mut sim = SimBackend::new();
        sim.fail_next_device_creation(ApiError::other("driver crashed"));

        let result = create(&mut sim, &CapabilityLevel::ALL);

        let Err(DeviceError::DeviceCreationFailed { reason }) = result else {
            panic!("expected DeviceCreationFailed");
        };
        assert!(reason.contains("driver crashed"));
        assert_eq!(sim.live(ObjectKind::Device), 0);
    }

    #[test]
    fn unordered_preferences_are_rejected_before_any_backend_call() {
        let mut sim = SimBackend::new();
        let result = create(&mut sim, &[CapabilityLevel::WebGl2, CapabilityLevel::Full]);

        assert!(matches!(result, Err(DeviceError::DeviceCreationFailed { .. })));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn release_drops_context_before_device() {
        let mut sim = SimBackend::new();
        let device = create(&mut sim, &CapabilityLevel::ALL).unwrap();
        sim.clear_events();

        device.release();

        let kinds: Vec<ObjectKind> = sim
            .events()
            .iter()
            .filter_map(|e| match e {
                SimEvent::Released { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![ObjectKind::Context, ObjectKind::Device]);
    }
}
