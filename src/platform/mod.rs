//! Hosting platform access
//!
//! Course repositories live on GitHub; every workflow talks to it through
//! the [`HostingPlatform`] trait.

pub mod github;
pub mod rate_limit;
pub mod traits;
pub mod types;

pub use traits::{HostingPlatform, PlatformError};
pub use types::{
    Branch, Collaborator, CommitInfo, ContentEntry, EntryKind, FileWrite, OrgSecret,
    PRCreateResult, PRSummary, PermissionLevel, Permissions, RemoteFile, RepoHandle, RepoName,
    SecretVisibility, Team, TokenStatus, Workflow, WorkflowRun,
};

use std::env;
use std::sync::Arc;

/// Default REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Pick the token from the command line, then `GH_TOKEN`.
///
/// `GITHUB_TOKEN` is already read by clap for `--token`.
pub fn resolve_token(cli_token: Option<&str>, needed_scopes: &str) -> Result<String, PlatformError> {
    let token = cli_token
        .map(|t| t.to_string())
        .or_else(|| env::var("GH_TOKEN").ok())
        .unwrap_or_default();

    if token.trim().is_empty() {
        return Err(PlatformError::AuthError(format!(
            "No GitHub token provided. Pass --token or set GITHUB_TOKEN with a personal access token granting: {}",
            needed_scopes
        )));
    }
    Ok(token)
}

/// Build the platform adapter used by every command
pub fn get_platform_adapter(api_url: Option<&str>, token: &str) -> Arc<dyn HostingPlatform> {
    Arc::new(github::GitHubAdapter::new(api_url, token))
}
