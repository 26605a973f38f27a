//! Autogit command implementation

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::output::Output;
use crate::core::autosync::{
    spawn_stop_signal, AutoSync, AutoSyncConfig, StopReason, DEFAULT_MAX_RUNTIME,
};
use crate::git;

#[derive(clap::Args, Debug, Clone)]
pub struct AutogitArgs {
    /// File that is automatically added, committed and pushed
    #[arg(long)]
    pub filename: PathBuf,

    /// Working copy (default: current directory)
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Seconds between ticks
    #[arg(long, default_value_t = 30)]
    pub interval: u64,

    /// Push on every n-th tick
    #[arg(long, default_value_t = 10)]
    pub push_every: u32,

    /// Stop after this many minutes
    #[arg(long, default_value_t = DEFAULT_MAX_RUNTIME.as_secs() / 60)]
    pub max_minutes: u64,
}

/// Run the autogit command
pub async fn run_autogit(args: &AutogitArgs) -> anyhow::Result<()> {
    git::ensure_git_cli()?;
    if !git::is_git_repo(&args.workdir) {
        anyhow::bail!(
            "{} is not a git working copy; clone the repository first",
            args.workdir.display()
        );
    }

    let config = AutoSyncConfig {
        interval: Duration::from_secs(args.interval),
        push_every: args.push_every.max(1),
        remote: args.remote.clone(),
        ..AutoSyncConfig::new(&args.workdir, &args.filename)
    };

    Output::info(&format!("Syncing every {} seconds", args.interval));
    Output::info("Enter CTRL+C to exit process");

    let (stop, timer) = spawn_stop_signal(Duration::from_secs(args.max_minutes * 60));
    let report = AutoSync::run(config, stop).await;
    timer.abort();
    let report = report?;

    match report.reason {
        StopReason::Timeout => Output::info("Time limit reached"),
        StopReason::Interrupted => Output::info("Exiting..."),
    }
    Output::kv("ticks", &report.ticks.to_string());
    Output::kv("commits", &report.commits.to_string());
    Output::kv("pushes", &report.pushes.to_string());
    if report.errors > 0 {
        Output::warning(&format!("{} ticks failed; see the log above", report.errors));
    }
    Ok(())
}
