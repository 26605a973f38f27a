//! classroom-tools: administer programming-course repositories on GitHub
//!
//! Template synchronization, repository administration, grading from test
//! logs and plagiarism checks, behind the `classroom` command.

pub mod cli;
pub mod core;
pub mod git;
pub mod grading;
pub mod plagiarism;
pub mod platform;
pub mod telemetry;
pub mod util;

pub use crate::core::config::ClassroomConfig;
pub use crate::platform::{HostingPlatform, PlatformError};
