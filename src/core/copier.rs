//! Template-to-target file copier
//!
//! Copies are whole-file replacements. The blob SHA reported by the forge
//! decides whether a write is needed, so re-running a sync against an
//! unchanged template performs no writes.

use std::fmt;
use tracing::{debug, warn};

use super::manifest::SyncManifest;
use super::tree::collect_files;
use crate::platform::{FileWrite, HostingPlatform, PlatformError, RemoteFile, RepoHandle};

/// Commit message of every synced file
pub const SYNC_COMMIT_MESSAGE: &str = "Auto sync with template repo";

/// What a single copy did to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for CopyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyOutcome::Created => write!(f, "created"),
            CopyOutcome::Updated => write!(f, "updated"),
            CopyOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CopyOptions<'a> {
    /// Branch to write to; the target's default branch when `None`
    pub branch: Option<&'a str>,
    pub message: &'a str,
}

impl Default for CopyOptions<'_> {
    fn default() -> Self {
        Self {
            branch: None,
            message: SYNC_COMMIT_MESSAGE,
        }
    }
}

/// Result for one file of one repository
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: String,
    pub result: Result<CopyOutcome, String>,
}

/// Per-file results for one target repository
#[derive(Debug, Clone, Default)]
pub struct RepoOutcome {
    pub repo: String,
    pub files: Vec<FileOutcome>,
}

impl RepoOutcome {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            files: Vec::new(),
        }
    }

    pub fn count(&self, outcome: CopyOutcome) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.result, Ok(o) if o == outcome))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

/// Results of a whole batch, in processing order
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub repos: Vec<RepoOutcome>,
}

impl BatchOutcome {
    pub fn push(&mut self, outcome: RepoOutcome) {
        self.repos.push(outcome);
    }

    pub fn count(&self, outcome: CopyOutcome) -> usize {
        self.repos.iter().map(|r| r.count(outcome)).sum()
    }

    pub fn failures(&self) -> usize {
        self.repos.iter().map(RepoOutcome::failures).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

/// Copy one template file into `target`.
///
/// Reads the target's file at the same path first: absent means create,
/// a different SHA means update, the same SHA means nothing to do.
pub async fn copy_file(
    platform: &dyn HostingPlatform,
    target: &RepoHandle,
    file: &RemoteFile,
    options: &CopyOptions<'_>,
) -> Result<CopyOutcome, PlatformError> {
    let branch = options.branch.unwrap_or(&target.default_branch);

    let existing_sha = match platform.get_file(target, &file.path, Some(branch)).await {
        Ok(existing) if existing.sha == file.sha => return Ok(CopyOutcome::Unchanged),
        Ok(existing) => Some(existing.sha),
        Err(PlatformError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    platform
        .put_file(
            target,
            FileWrite {
                path: &file.path,
                message: options.message,
                content: &file.content,
                sha: existing_sha.as_deref(),
                branch,
            },
        )
        .await?;

    Ok(if existing_sha.is_some() {
        CopyOutcome::Updated
    } else {
        CopyOutcome::Created
    })
}

/// Copy every file into `target`, continuing past per-file failures
pub async fn sync_repository(
    platform: &dyn HostingPlatform,
    target: &RepoHandle,
    files: &[RemoteFile],
    options: &CopyOptions<'_>,
) -> RepoOutcome {
    let mut outcome = RepoOutcome::new(&target.full_name);

    for file in files {
        let result = copy_file(platform, target, file, options).await;
        match &result {
            Ok(copy) => debug!(repo = %target.full_name, path = %file.path, outcome = %copy, "Synced file"),
            Err(e) => warn!(repo = %target.full_name, path = %file.path, error = %e, "Failed to sync file"),
        }
        outcome.files.push(FileOutcome {
            path: file.path.clone(),
            result: result.map_err(|e| e.to_string()),
        });
    }

    outcome
}

/// Template files selected by a manifest
#[derive(Debug, Clone, Default)]
pub struct ManifestFiles {
    pub files: Vec<RemoteFile>,
    /// Manifest paths with no matching file in the template
    pub missing: Vec<String>,
}

/// Walk the template and fetch every file the manifest lists
pub async fn fetch_manifest_files(
    platform: &dyn HostingPlatform,
    template: &RepoHandle,
    manifest: &SyncManifest,
) -> Result<ManifestFiles, PlatformError> {
    let entries = collect_files(platform, template, "").await?;

    let mut files = Vec::new();
    for entry in entries.iter().filter(|e| manifest.contains(&e.path)) {
        files.push(platform.get_file(template, &entry.path, None).await?);
    }

    let missing = manifest
        .iter()
        .filter(|p| !entries.iter().any(|e| e.path == *p))
        .map(String::from)
        .collect();

    Ok(ManifestFiles { files, missing })
}
