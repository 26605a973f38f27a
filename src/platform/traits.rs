//! Hosting platform trait definition

use async_trait::async_trait;
use thiserror::Error;

use super::types::*;

/// Errors that can occur during platform operations
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 409/422: the resource already exists or the request conflicts with its state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}

/// Interface to the forge hosting the course repositories.
///
/// Every call is a single best-effort request (plus pagination); nothing is
/// retried.
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Check the token is accepted and report its identity and quota
    async fn verify_token(&self) -> Result<TokenStatus, PlatformError>;

    async fn get_repository(&self, repo: &RepoName) -> Result<RepoHandle, PlatformError>;

    /// Every repository of an organization, in API order
    async fn list_org_repositories(&self, org: &str) -> Result<Vec<RepoHandle>, PlatformError>;

    /// Entries of one directory (`""` is the repository root)
    async fn list_directory(
        &self,
        repo: &RepoHandle,
        path: &str,
    ) -> Result<Vec<ContentEntry>, PlatformError>;

    /// Fetch a file's bytes and marker on `branch` (default branch if `None`)
    async fn get_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        branch: Option<&str>,
    ) -> Result<RemoteFile, PlatformError>;

    /// Create or update a file in a single commit
    async fn put_file(&self, repo: &RepoHandle, write: FileWrite<'_>) -> Result<(), PlatformError>;

    async fn delete_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> Result<(), PlatformError>;

    /// Generate `owner/name` from a template repository
    async fn generate_from_template(
        &self,
        template: &RepoName,
        owner: &str,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<(), PlatformError>;

    async fn list_collaborators(&self, repo: &RepoHandle)
        -> Result<Vec<Collaborator>, PlatformError>;

    async fn add_collaborator(
        &self,
        repo: &RepoHandle,
        login: &str,
        permission: PermissionLevel,
    ) -> Result<(), PlatformError>;

    /// Teams with access to a repository, with their permission
    async fn list_repo_teams(&self, repo: &RepoHandle) -> Result<Vec<Team>, PlatformError>;

    async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>, PlatformError>;

    async fn set_team_permission(
        &self,
        org: &str,
        team_slug: &str,
        repo: &RepoHandle,
        permission: PermissionLevel,
    ) -> Result<(), PlatformError>;

    async fn get_branch(&self, repo: &RepoHandle, branch: &str) -> Result<Branch, PlatformError>;

    /// Protect a branch so nobody can push to it
    async fn protect_branch(&self, repo: &RepoHandle, branch: &str) -> Result<(), PlatformError>;

    async fn unprotect_branch(&self, repo: &RepoHandle, branch: &str)
        -> Result<(), PlatformError>;

    async fn set_default_branch(
        &self,
        repo: &RepoHandle,
        branch: &str,
    ) -> Result<(), PlatformError>;

    async fn get_commit(&self, repo: &RepoHandle, sha: &str) -> Result<CommitInfo, PlatformError>;

    /// Point `refs/heads/{branch}` at `sha`, force-updating an existing ref
    async fn create_or_update_branch_ref(
        &self,
        repo: &RepoHandle,
        branch: &str,
        sha: &str,
    ) -> Result<(), PlatformError>;

    async fn create_pull_request(
        &self,
        repo: &RepoHandle,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PRCreateResult, PlatformError>;

    async fn list_open_pull_requests(
        &self,
        repo: &RepoHandle,
    ) -> Result<Vec<PRSummary>, PlatformError>;

    /// Send a `repository_dispatch` event
    async fn dispatch_event(&self, repo: &RepoHandle, event_type: &str)
        -> Result<(), PlatformError>;

    async fn list_workflows(&self, repo: &RepoHandle) -> Result<Vec<Workflow>, PlatformError>;

    async fn list_workflow_runs(&self, repo: &RepoHandle)
        -> Result<Vec<WorkflowRun>, PlatformError>;

    async fn delete_workflow_run(&self, repo: &RepoHandle, run_id: u64)
        -> Result<(), PlatformError>;

    async fn list_org_secrets(&self, org: &str) -> Result<Vec<OrgSecret>, PlatformError>;

    /// Full names of the repositories a `selected` org secret is shared with
    async fn list_secret_repositories(
        &self,
        org: &str,
        secret: &str,
    ) -> Result<Vec<String>, PlatformError>;

    async fn list_repo_secrets(&self, repo: &RepoHandle) -> Result<Vec<String>, PlatformError>;
}
