//! Shared types for the hosting platform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `Owner/Name` repository identifier as given on the command line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoName {
    pub owner: String,
    pub name: String,
}

impl RepoName {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Full `owner/name` form
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => {
                Ok(RepoName::new(*owner, *name))
            }
            _ => Err(format!(
                "invalid repository '{}': expected format OrgName/RepoName",
                s
            )),
        }
    }
}

/// A remote repository resolved through the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoHandle {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
    pub is_template: bool,
}

impl RepoHandle {
    pub fn repo_name(&self) -> RepoName {
        RepoName::new(&self.owner, &self.name)
    }
}

/// Kind of an entry in a repository directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Path relative to the repository root
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    /// Git blob SHA, used as identity marker
    pub sha: String,
}

/// A file's content at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: Vec<u8>,
    /// Git blob SHA; only compared for change detection
    pub sha: String,
}

impl RemoteFile {
    /// Last path component
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Create-or-update request for a single file
#[derive(Debug, Clone)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    pub message: &'a str,
    pub content: &'a [u8],
    /// Marker of the file being replaced; `None` creates the file
    pub sha: Option<&'a str>,
    pub branch: &'a str,
}

/// Collaborator permission level that can be granted in batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Read-only
    Pull,
    /// Read and write
    Push,
    #[value(skip)]
    Admin,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Pull => write!(f, "pull"),
            PermissionLevel::Push => write!(f, "push"),
            PermissionLevel::Admin => write!(f, "admin"),
        }
    }
}

/// Permission flags reported for a collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub pull: bool,
}

impl Permissions {
    /// Whether these flags grant `level`
    pub fn grants(&self, level: PermissionLevel) -> bool {
        match level {
            PermissionLevel::Pull => self.pull,
            PermissionLevel::Push => self.push,
            PermissionLevel::Admin => self.admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub login: String,
    #[serde(default)]
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub slug: String,
    /// Permission on the repository the team was listed from
    #[serde(default)]
    pub permission: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub sha: String,
    pub protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub parents: Vec<String>,
}

/// Result of creating a PR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PRCreateResult {
    pub number: u64,
    pub url: String,
}

/// Open pull request as listed on a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PRSummary {
    pub number: u64,
    pub title: String,
    pub head: String,
    pub base: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub workflow_id: u64,
    /// Name of the workflow the run belongs to
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl WorkflowRun {
    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("completed") && self.conclusion.as_deref() == Some("failure")
    }
}

/// Visibility of an organization secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretVisibility {
    All,
    Private,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSecret {
    pub name: String,
    pub visibility: SecretVisibility,
}

/// Identity and quota of the token in use
#[derive(Debug, Clone)]
pub struct TokenStatus {
    pub login: String,
    pub scopes: Vec<String>,
    pub rate_limit: super::rate_limit::RateLimitInfo,
}
