//! Time subsystem.
//!
//! Provides the step timer the host harness drives once per tick.
//! The lifecycle only reads the frame count from it.

mod step_timer;

pub use step_timer::{StepTime, StepTimer};
