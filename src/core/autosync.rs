//! Auto-commit/sync loop for a single file in a local working copy
//!
//! The loop is Running until the stop signal fires, then Stopped. The signal
//! is only observed between ticks: a git command that is already running
//! finishes first.

use git2::Repository;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::git::{self, GitError};

pub const AUTO_COMMIT_MESSAGE: &str = "Auto commit";

#[derive(Debug, Clone)]
pub struct AutoSyncConfig {
    pub workdir: PathBuf,
    /// File to commit, relative to `workdir`
    pub file: PathBuf,
    pub remote: String,
    pub interval: Duration,
    /// Push on every n-th tick
    pub push_every: u32,
}

impl AutoSyncConfig {
    pub fn new(workdir: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            file: file.into(),
            remote: "origin".to_string(),
            interval: Duration::from_secs(30),
            push_every: 10,
        }
    }

    /// `file` as a clean path relative to `workdir`. `./` prefixes are
    /// dropped; an absolute path must point inside the working copy.
    pub fn tracked_file(&self) -> Result<PathBuf, GitError> {
        let outside = || GitError::OutsideWorkdir(self.file.display().to_string());

        let relative = if self.file.is_absolute() {
            let root = self.workdir.canonicalize()?;
            canonical_target(&self.file)
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .map_err(|_| outside())?
        } else {
            self.file.clone()
        };

        let mut clean = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => clean.push(part),
                _ => return Err(outside()),
            }
        }
        if clean.as_os_str().is_empty() {
            return Err(outside());
        }
        Ok(clean)
    }
}

/// Resolve symlinks of `path`, or of its parent when the file doesn't exist yet
fn canonical_target(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent().map(Path::canonicalize), path.file_name()) {
        (Some(Ok(parent)), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

/// Default wall-clock limit of a session
pub const DEFAULT_MAX_RUNTIME: Duration = Duration::from_secs(3 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Timeout,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSyncReport {
    pub ticks: u64,
    pub commits: u64,
    pub pushes: u64,
    pub errors: u64,
    pub reason: StopReason,
}

/// Arm a stop signal that fires after `max_runtime` or on Ctrl-C,
/// whichever comes first. Abort the handle to cancel the timer.
pub fn spawn_stop_signal(max_runtime: Duration) -> (oneshot::Receiver<StopReason>, JoinHandle<()>) {
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let reason = first_stop(max_runtime, tokio::signal::ctrl_c()).await;
        let _ = tx.send(reason);
    });
    (rx, handle)
}

/// Wait for the time limit or `interrupt`. When the interrupt listener
/// can't be installed only the time limit applies.
async fn first_stop<F>(max_runtime: Duration, interrupt: F) -> StopReason
where
    F: Future<Output = std::io::Result<()>>,
{
    let interrupted = async {
        match interrupt.await {
            Ok(()) => StopReason::Interrupted,
            Err(e) => {
                warn!(error = %e, "Can't listen for Ctrl-C; stopping on the time limit only");
                std::future::pending().await
            }
        }
    };
    tokio::select! {
        _ = tokio::time::sleep(max_runtime) => StopReason::Timeout,
        reason = interrupted => reason,
    }
}

pub struct AutoSync {
    config: AutoSyncConfig,
    /// Tracked file relative to the working copy
    file: PathBuf,
    repo: Repository,
    state: LoopState,
    report: AutoSyncReport,
}

impl AutoSync {
    /// Run until `stop` fires. Only opening the working copy and
    /// resolving the tracked file are fatal.
    pub async fn run(
        config: AutoSyncConfig,
        mut stop: oneshot::Receiver<StopReason>,
    ) -> Result<AutoSyncReport, GitError> {
        let repo = git::open_repo(&config.workdir)?;
        let file = config.tracked_file()?;
        let mut session = AutoSync {
            config,
            file,
            repo,
            state: LoopState::Running,
            report: AutoSyncReport {
                ticks: 0,
                commits: 0,
                pushes: 0,
                errors: 0,
                reason: StopReason::Interrupted,
            },
        };

        while session.state == LoopState::Running {
            if let Ok(reason) = stop.try_recv() {
                session.state = LoopState::Stopped(reason);
                break;
            }

            session.report.ticks += 1;
            // git runs blocking commands, some of them over the network
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let mut session = session;
                let result = session.tick();
                (session, result)
            })
            .await
            .map_err(|e| GitError::OperationFailed(format!("Auto sync tick panicked: {}", e)))?;
            session = returned;
            if let Err(e) = result {
                session.report.errors += 1;
                warn!(tick = session.report.ticks, error = %e, "Auto sync tick failed");
            }

            tokio::select! {
                reason = &mut stop => {
                    // A dropped sender counts as an interrupt
                    session.state = LoopState::Stopped(reason.unwrap_or(StopReason::Interrupted));
                }
                _ = tokio::time::sleep(session.config.interval) => {}
            }
        }

        if let LoopState::Stopped(reason) = session.state {
            session.report.reason = reason;
        }
        info!(
            ticks = session.report.ticks,
            commits = session.report.commits,
            pushes = session.report.pushes,
            errors = session.report.errors,
            "Auto sync stopped"
        );
        Ok(session.report)
    }

    fn tick(&mut self) -> Result<(), GitError> {
        git::stage_paths(&self.repo, &[&self.file])?;
        if git::commit_staged(&self.repo, AUTO_COMMIT_MESSAGE)?.is_some() {
            self.report.commits += 1;
        }

        git::stash_changes(&self.repo)?;
        git::pull_rebase(&self.repo, &self.config.remote)?;

        if self.report.ticks % u64::from(self.config.push_every.max(1)) == 0 {
            git::push_head(&self.repo, &self.config.remote)?;
            self.report.pushes += 1;
        }

        if let Some(last) = git::head_log(&self.repo, 1)?.first() {
            debug!(head = %last, "Auto sync tick complete");
        }
        Ok(())
    }
}
