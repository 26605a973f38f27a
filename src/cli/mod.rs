//! CLI layer
//!
//! Command-line interface using clap.

pub mod batch;
pub mod commands;
pub mod context;
pub mod output;

pub use batch::{BatchSummary, RepoVisitResult};
pub use context::{CommandContext, GlobalArgs, TargetArgs};
pub use output::Output;
