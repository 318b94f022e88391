//! Rekindle engine crate.
//!
//! This crate owns a GPU device and everything created from it across a
//! window's lifetime, and rebuilds all of it when the device is lost.

pub mod device;
pub mod gpu;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
