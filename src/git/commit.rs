//! Staging and committing with libgit2

use git2::{Repository, Status, StatusOptions};
use std::path::Path;

use super::GitError;

#[cfg(feature = "telemetry")]
use tracing::debug;

/// Stage the given paths, relative to the working directory
pub fn stage_paths<P: AsRef<Path>>(repo: &Repository, paths: &[P]) -> Result<(), GitError> {
    let mut index = repo.index()?;
    for path in paths {
        index.add_path(path.as_ref())?;
    }
    index.write()?;
    Ok(())
}

/// Whether the index differs from HEAD
pub fn has_staged_changes(repo: &Repository) -> Result<bool, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);

    let staged = Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE;

    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(statuses.iter().any(|entry| entry.status().intersects(staged)))
}

/// Commit the index on top of HEAD.
///
/// Returns `None` without committing when nothing is staged.
pub fn commit_staged(repo: &Repository, message: &str) -> Result<Option<String>, GitError> {
    if !has_staged_changes(repo)? {
        return Ok(None);
    }

    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let signature = repo.signature()?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e.into()),
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;

    #[cfg(feature = "telemetry")]
    debug!(commit = %oid, message, "Created commit");

    Ok(Some(oid.to_string()))
}
