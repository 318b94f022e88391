//! Logger setup for binaries.
//!
//! The engine itself only emits through `log`. Lifecycle transitions go out at
//! info and device losses at warn.

mod init;

pub use init::{init_logging, LoggingConfig};
