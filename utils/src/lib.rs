//! Shared utilities for the Coffer workspace.

pub mod logging;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
