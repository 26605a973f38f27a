//! Trigger command implementation

use crate::cli::batch::{BatchSummary, RepoVisitResult};
use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::Output;

#[derive(clap::Args, Debug, Clone)]
pub struct TriggerArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// `repository_dispatch` event type
    #[arg(long, default_value = "Manual trigger")]
    pub event_type: String,
}

/// Run the trigger command
pub async fn run_trigger(ctx: &CommandContext, args: &TriggerArgs) -> anyhow::Result<()> {
    Output::banner("Triggering workflows");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("event type", args.event_type.clone()),
    ]);

    let platform = ctx.connect("repo, workflow").await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        let result = platform.dispatch_event(repo, &args.event_type).await;
        summary.record(RepoVisitResult::from_result(&repo.name, result, |_| {
            format!("sent '{}'", args.event_type)
        }));
    }
    summary.finish()
}
