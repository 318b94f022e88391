use thiserror::Error;

use super::LifecycleState;

/// Raw status reported by a backend call.
///
/// Backends report what the driver said; the lifecycle components decide what
/// it means (see [`DeviceError`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("device removed")]
    DeviceRemoved,

    #[error("device reset")]
    DeviceReset,

    /// The requested capability level (or feature) is not available.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Acquiring the next back buffer timed out.
    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Removal/reset class: the device generation is gone.
    pub fn is_device_loss(&self) -> bool {
        matches!(self, Self::DeviceRemoved | Self::DeviceReset)
    }
}

/// Lifecycle error taxonomy.
///
/// Only the loss class (`SurfaceLost`, `DeviceLost`) is recoverable, and the
/// orchestrator handles it internally. Everything else is fatal to the caller.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device creation failed: {reason}")]
    DeviceCreationFailed { reason: String },

    #[error("presentation surface lost during {op}")]
    SurfaceLost { op: &'static str },

    #[error("device lost during {op}")]
    DeviceLost { op: &'static str },

    #[error("{op} failed: {source}")]
    TransientApiFailure {
        op: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("`{op}` is not valid in the {state:?} state")]
    InvalidState {
        op: &'static str,
        state: LifecycleState,
    },
}

impl DeviceError {
    /// Returns true for the recoverable loss class.
    pub fn is_loss(&self) -> bool {
        matches!(self, Self::SurfaceLost { .. } | Self::DeviceLost { .. })
    }

    /// Classifies a surface create/resize/acquire failure.
    pub(crate) fn from_surface_call(op: &'static str, err: ApiError) -> Self {
        if err.is_device_loss() {
            Self::SurfaceLost { op }
        } else {
            Self::TransientApiFailure { op, source: err }
        }
    }

    /// Turns a loss observed during bring-up into a fatal failure.
    ///
    /// Initial bring-up (and the bring-up inside recovery) is never retried.
    pub(crate) fn into_fatal(self) -> Self {
        match self {
            Self::SurfaceLost { op } | Self::DeviceLost { op } => Self::TransientApiFailure {
                op,
                source: ApiError::DeviceRemoved,
            },
            other => other,
        }
    }
}

/// Result of a present request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentOutcome {
    /// Frame presented and the next back buffer is bound-ready.
    Presented,
    /// Nothing was presented (no back buffer could be acquired in time).
    Skipped,
    /// The runtime reported removal/reset; full recovery is required.
    DeviceLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_and_reset_are_loss() {
        assert!(ApiError::DeviceRemoved.is_device_loss());
        assert!(ApiError::DeviceReset.is_device_loss());
        assert!(!ApiError::Timeout.is_device_loss());
        assert!(!ApiError::other("boom").is_device_loss());
    }

    #[test]
    fn surface_calls_classify_loss_as_surface_lost() {
        let err = DeviceError::from_surface_call("resize_surface", ApiError::DeviceReset);
        assert!(matches!(err, DeviceError::SurfaceLost { op: "resize_surface" }));
        assert!(err.is_loss());

        let err = DeviceError::from_surface_call("resize_surface", ApiError::other("bad size"));
        assert!(matches!(err, DeviceError::TransientApiFailure { .. }));
        assert!(!err.is_loss());
    }

    #[test]
    fn bring_up_loss_becomes_fatal() {
        let err = DeviceError::DeviceLost { op: "present" }.into_fatal();
        assert!(!err.is_loss());
        assert!(matches!(
            err,
            DeviceError::TransientApiFailure { op: "present", source: ApiError::DeviceRemoved }
        ));
    }

    #[test]
    fn display_names_the_operation() {
        let err = DeviceError::TransientApiFailure {
            op: "create_surface",
            source: ApiError::other("no formats"),
        };
        assert_eq!(err.to_string(), "create_surface failed: no formats");
    }
}
