//! Core engine-facing contracts.
//!
//! This module defines the interface between the lifecycle manager and
//! scene code, plus the host harness that sequences both.

mod app;
mod ctx;
mod harness;

pub use app::Scene;
pub use ctx::{FrameCtx, GpuCtx};
pub use harness::{default_size, Harness};
