//! wgpu backend.
//!
//! Maps the lifecycle's native calls onto wgpu: one `Instance` per device
//! generation, the `Queue` as the context, `Surface::configure` as the in-place
//! resize, and the device-lost callback as the removal signal.

mod backend;
mod format;

pub use backend::{WgpuBackend, WgpuDevice, WgpuOptions, WgpuSurface};
pub use format::{depth_format, limits_for, present_mode, texture_format};
