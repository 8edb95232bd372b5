//! Telemetry: structured logging for the access checker.
//!
//! Decisions and configuration problems are reported through `tracing`
//! events; this module installs the subscriber that renders them.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};
