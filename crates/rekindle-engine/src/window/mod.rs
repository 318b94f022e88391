//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and forwards window events to the
//! host harness.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
