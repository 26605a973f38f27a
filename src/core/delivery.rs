//! Delivery of synced files: through the API to many repositories, or
//! into one local working copy followed by commit, pull and push.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::info;

use super::copier::{sync_repository, BatchOutcome, CopyOptions, RepoOutcome, SYNC_COMMIT_MESSAGE};
use super::directory::{find_repositories, LookupError};
use crate::git::{self, GitError};
use crate::platform::{HostingPlatform, RemoteFile};

/// Where synced files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// Every repository of `org` whose name contains `filter`
    Api { org: String, filter: String },
    /// A local working copy, pushed to `remote`
    Local { workdir: PathBuf, remote: String },
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Sync conflict in {}: {message}. The synced files are kept in the working tree", workdir.display())]
    SyncConflict { workdir: PathBuf, message: String },

    #[error("Refusing to write outside the working copy: {0}")]
    UnsafePath(String),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(GitError),
}

impl DeliveryError {
    fn from_git(workdir: &Path, err: GitError) -> Self {
        match err {
            GitError::Conflict(message) => DeliveryError::SyncConflict {
                workdir: workdir.to_path_buf(),
                message,
            },
            other => DeliveryError::Git(other),
        }
    }
}

/// Result of a local delivery
#[derive(Debug, Clone, Default)]
pub struct LocalDelivery {
    pub written: Vec<String>,
    /// New commit id, `None` when the files were already up to date
    pub commit: Option<String>,
}

#[derive(Debug, Clone)]
pub enum DeliveryReport {
    Api(BatchOutcome),
    Local(LocalDelivery),
}

/// Deliver `files` to `target`.
///
/// `progress` is called after each repository of an API delivery.
pub async fn deliver(
    platform: &dyn HostingPlatform,
    files: &[RemoteFile],
    target: &DeliveryTarget,
    options: &CopyOptions<'_>,
    progress: &mut dyn FnMut(&RepoOutcome),
) -> Result<DeliveryReport, DeliveryError> {
    match target {
        DeliveryTarget::Api { org, filter } => {
            let repos = find_repositories(platform, org, filter).await?;
            let mut batch = BatchOutcome::default();
            for repo in &repos {
                let outcome = sync_repository(platform, repo, files, options).await;
                progress(&outcome);
                batch.push(outcome);
            }
            Ok(DeliveryReport::Api(batch))
        }
        DeliveryTarget::Local { workdir, remote } => {
            deliver_local(files, workdir, remote).map(DeliveryReport::Local)
        }
    }
}

fn checked_relative(path: &str) -> Result<&Path, DeliveryError> {
    let relative = Path::new(path);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || path.is_empty() {
        return Err(DeliveryError::UnsafePath(path.to_string()));
    }
    Ok(relative)
}

/// Write files into `workdir`, commit them, rebase onto `remote` and push.
///
/// Nothing is rolled back on failure: a conflicting pull or rejected push
/// leaves the synced content and the local commit in place.
pub fn deliver_local(
    files: &[RemoteFile],
    workdir: &Path,
    remote: &str,
) -> Result<LocalDelivery, DeliveryError> {
    git::ensure_git_cli().map_err(DeliveryError::Git)?;
    let repo = git::open_repo(workdir).map_err(|e| DeliveryError::from_git(workdir, e))?;

    let mut written = Vec::new();
    for file in files {
        let relative = checked_relative(&file.path)?;
        let dest = workdir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| DeliveryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&dest, &file.content).map_err(|source| DeliveryError::Io {
            path: dest.clone(),
            source,
        })?;
        written.push(file.path.clone());
    }

    git::stage_paths(&repo, &written).map_err(|e| DeliveryError::from_git(workdir, e))?;
    let commit = git::commit_staged(&repo, SYNC_COMMIT_MESSAGE)
        .map_err(|e| DeliveryError::from_git(workdir, e))?;
    info!(workdir = %workdir.display(), files = written.len(), committed = commit.is_some(), "Wrote synced files");

    git::pull_rebase(&repo, remote).map_err(|e| DeliveryError::from_git(workdir, e))?;
    git::push_head(&repo, remote).map_err(|e| DeliveryError::from_git(workdir, e))?;

    Ok(LocalDelivery { written, commit })
}
