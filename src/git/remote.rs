//! Git remote operations

use git2::Repository;

use super::{run_git, GitError};

#[cfg(feature = "telemetry")]
use std::time::Instant;
#[cfg(feature = "telemetry")]
use tracing::debug;

/// Pull with rebase from `remote`.
///
/// A conflicting rebase is aborted so the working tree is left as it was
/// before the pull, and reported as [`GitError::Conflict`].
pub fn pull_rebase(repo: &Repository, remote: &str) -> Result<(), GitError> {
    #[cfg(feature = "telemetry")]
    let start = Instant::now();

    let branch = super::get_current_branch(repo)?;
    let output = run_git(repo, &["pull", "--rebase", remote, &branch])?;
    let success = output.status.success();

    #[cfg(feature = "telemetry")]
    {
        let duration = start.elapsed();
        debug!(
            remote,
            success,
            duration_ms = duration.as_millis() as u64,
            "Git pull complete"
        );
    }

    if success {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stderr.contains("CONFLICT") || stdout.contains("CONFLICT") || stderr.contains("could not apply") {
        // Best effort: leave the working copy usable
        let _ = run_git(repo, &["rebase", "--abort"]);
        return Err(GitError::Conflict(format!(
            "rebase onto {}/{} conflicted and was aborted",
            remote, branch
        )));
    }
    Err(GitError::OperationFailed(interpret_remote_error(&stderr)))
}

/// Push the current HEAD to the same-named branch of `remote`
pub fn push_head(repo: &Repository, remote: &str) -> Result<(), GitError> {
    #[cfg(feature = "telemetry")]
    let start = Instant::now();

    let output = run_git(repo, &["push", remote, "HEAD"])?;
    let success = output.status.success();

    #[cfg(feature = "telemetry")]
    {
        let duration = start.elapsed();
        debug!(
            remote,
            success,
            duration_ms = duration.as_millis() as u64,
            "Git push complete"
        );
    }

    if success {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let lower = stderr.to_lowercase();
    if lower.contains("rejected") || lower.contains("non-fast-forward") || lower.contains("fetch first") {
        return Err(GitError::Conflict(format!(
            "push to {} rejected: remote has changes.\n(Original: {})",
            remote,
            stderr.trim()
        )));
    }
    Err(GitError::OperationFailed(interpret_remote_error(&stderr)))
}

/// Stash local modifications.
///
/// Returns `false` when there was nothing to stash.
pub fn stash_changes(repo: &Repository) -> Result<bool, GitError> {
    let output = run_git(repo, &["stash", "push"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(format!("git stash failed: {}", stderr.trim())));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(!stdout.contains("No local changes to save") && !stderr.contains("No local changes to save"))
}

/// One-line summaries of the latest `count` commits on HEAD
pub fn head_log(repo: &Repository, count: usize) -> Result<Vec<String>, GitError> {
    let limit = format!("-{}", count);
    let output = run_git(repo, &["log", "--oneline", &limit])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(format!("git log failed: {}", stderr.trim())));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Interpret common git pull/push errors into user-friendly messages
fn interpret_remote_error(stderr: &str) -> String {
    let lower = stderr.to_lowercase();
    if lower.contains("could not read from remote") || lower.contains("repository not found") {
        return format!(
            "Cannot reach remote. Check your network connection and repository URL.\n\
             (Original: {})",
            stderr.trim()
        );
    }
    if lower.contains("permission denied") || lower.contains("authentication failed") {
        return format!(
            "Authentication failed. Check the credentials configured for git.\n\
             (Original: {})",
            stderr.trim()
        );
    }
    stderr.trim().to_string()
}
