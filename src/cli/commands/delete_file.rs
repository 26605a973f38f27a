//! Delete-file command implementation

use crate::cli::batch::{BatchSummary, RepoVisitResult};
use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::Output;
use crate::platform::{HostingPlatform, PlatformError, RepoHandle};

#[derive(clap::Args, Debug, Clone)]
pub struct DeleteFileArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Path of the file in each repository
    #[arg(long)]
    pub path: String,
}

/// Delete `path` on the default branch; the file must exist
pub async fn delete_remote_file(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    path: &str,
) -> Result<(), PlatformError> {
    let file = platform.get_file(repo, path, None).await?;
    platform
        .delete_file(
            repo,
            path,
            &format!("Delete {}", path),
            &file.sha,
            &repo.default_branch,
        )
        .await
}

/// Run the delete-file command
pub async fn run_delete_file(ctx: &CommandContext, args: &DeleteFileArgs) -> anyhow::Result<()> {
    Output::banner("Deleting file");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("path", args.path.clone()),
    ]);

    let platform = ctx.connect("repo").await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        let result = delete_remote_file(platform.as_ref(), repo, &args.path).await;
        summary.record(match result {
            Ok(()) => RepoVisitResult::Success(format!("{}: deleted {}", repo.full_name, args.path)),
            Err(PlatformError::NotFound(_)) => {
                RepoVisitResult::Error(format!("{}: {} does not exist", repo.full_name, args.path))
            }
            Err(e) => RepoVisitResult::Error(format!("{}: {}", repo.full_name, e)),
        });
    }
    summary.finish()
}
