//! GPU device + surface lifecycle.
//!
//! This module is responsible for:
//! - negotiating a capability level and creating the device and its context
//! - creating, resizing and presenting the surface and its derived views
//! - detecting device loss and rebuilding the whole generation
//!
//! Native calls go through [`Backend`]; `crate::gpu` provides the wgpu one and
//! [`sim`] a headless recording one.

mod backend;
mod caps;
mod error;
mod extent;
mod factory;
mod generation;
mod init;
mod lifecycle;
mod loss;
mod surface;
mod target;

pub mod sim;

pub use backend::{AdapterIdentity, Backend, CreatedDevice};
pub use caps::CapabilityLevel;
pub use error::{ApiError, DeviceError, PresentOutcome};
pub use extent::{Extent, Rotation};
pub use factory::{create_device, DeviceGeneration};
pub use generation::{Generation, Tagged};
pub use init::{
    ClearValues, DepthDesc, DepthFormat, DeviceConfig, DiagnosticOptions, SurfaceDesc,
    SurfaceFormat, BENIGN_MESSAGES,
};
pub use lifecycle::{Lifecycle, LifecycleState, RenderOutcome};
pub use loss::is_device_still_valid;
pub use surface::SurfaceManager;
pub use target::{WindowKind, WindowSource, WindowTarget};
