//! Git operations on local working copies
//!
//! Index and commit work goes through git2 (libgit2 bindings); anything
//! that talks to a remote (pull, push, stash, rebase) shells out to the
//! `git` CLI so the user's credential helpers and config apply.

pub mod commit;
pub mod remote;

pub use commit::*;
pub use remote::*;

use crate::util::log_cmd;
use git2::Repository;
use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;

/// Errors that can occur during git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Not a git repository: {0}")]
    NotARepo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// The remote moved: a rebase conflicted or a push was rejected
    #[error("Conflict with remote: {0}")]
    Conflict(String),

    #[error("Reference error: {0}")]
    Reference(String),

    #[error("Path is outside the working copy: {0}")]
    OutsideWorkdir(String),
}

/// Open a git repository at the given path
pub fn open_repo<P: AsRef<Path>>(path: P) -> Result<Repository, GitError> {
    Repository::open(path.as_ref())
        .map_err(|e| GitError::NotARepo(format!("{}: {}", path.as_ref().display(), e)))
}

/// Check if a path is a git repository
pub fn is_git_repo<P: AsRef<Path>>(path: P) -> bool {
    Repository::open(path.as_ref()).is_ok()
}

/// Make sure the `git` executable is on PATH
pub fn ensure_git_cli() -> Result<(), GitError> {
    which::which("git")
        .map(|_| ())
        .map_err(|_| GitError::OperationFailed("git executable not found on PATH".to_string()))
}

/// Get the working directory of a repository
pub fn get_workdir(repo: &Repository) -> &Path {
    repo.workdir().unwrap_or_else(|| repo.path())
}

/// Get the current branch name
pub fn get_current_branch(repo: &Repository) -> Result<String, GitError> {
    let head = repo
        .head()
        .map_err(|e| GitError::Reference(e.to_string()))?;

    if head.is_branch() {
        let name = head.shorthand().unwrap_or("HEAD");
        Ok(name.to_string())
    } else {
        let oid = head
            .target()
            .ok_or_else(|| GitError::Reference("HEAD has no target".to_string()))?;
        Ok(format!("(HEAD detached at {})", &oid.to_string()[..7]))
    }
}

/// Run `git <args>` in the repository's working directory
pub(crate) fn run_git(repo: &Repository, args: &[&str]) -> Result<Output, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(get_workdir(repo));
    log_cmd(&cmd);
    cmd.output()
        .map_err(|e| GitError::OperationFailed(format!("failed to run git {}: {}", args.join(" "), e)))
}
