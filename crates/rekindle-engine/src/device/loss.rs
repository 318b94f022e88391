use super::{AdapterIdentity, Backend};

/// Checks whether `device` is still usable.
///
/// The device is no longer valid if it reports a removal reason, or if the
/// system's default adapter is no longer the one captured at creation. Failing
/// to enumerate any adapter also counts as invalid.
pub fn is_device_still_valid<B: Backend>(
    backend: &mut B,
    device: &B::Device,
    captured: &AdapterIdentity,
) -> bool {
    if let Some(reason) = backend.device_removed_reason(device) {
        log::warn!("device reports removal: {reason}");
        return false;
    }

    match backend.default_adapter() {
        Ok(current) if current == *captured => true,
        Ok(current) => {
            log::info!("default adapter changed from {captured} to {current}");
            false
        }
        Err(err) => {
            log::warn!("could not enumerate the default adapter: {err}");
            false
        }
    }
}
