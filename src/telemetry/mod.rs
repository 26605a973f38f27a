//! Structured logging for classroom-tools.
//!
//! # Feature Flags
//!
//! - `telemetry` (default): timing events around HTTP requests and git commands
//! - `release-logs`: Strip debug/trace at compile time

mod init;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
