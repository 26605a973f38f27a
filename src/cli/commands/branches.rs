//! Branch administration across student repositories
//!
//! Protection, default branch, frozen submission branches and grading
//! pull requests.

use clap::ArgAction;

use crate::cli::batch::{BatchSummary, RepoVisitResult};
use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::Output;
use crate::platform::{HostingPlatform, PlatformError, RepoHandle};

const BRANCH_SCOPES: &str = "repo";

#[derive(clap::Args, Debug, Clone)]
pub struct ProtectBranchArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Branch to change
    #[arg(long)]
    pub branch: String,

    /// `true` restricts pushes to nobody, `false` removes the protection
    #[arg(long, action = ArgAction::Set)]
    pub protect: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DefaultBranchArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// New default branch
    #[arg(long)]
    pub branch: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FreezeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Protected branch pointing at the default branch head
    #[arg(long)]
    pub branch_name: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GradingPrArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Branch with the work to grade (default: the default branch)
    #[arg(long)]
    pub head: Option<String>,

    /// Grading base branch, created at the first commit
    #[arg(long)]
    pub base: String,

    #[arg(long, default_value = "Grading")]
    pub pull_request_title: String,

    #[arg(long, default_value = "")]
    pub pull_request_body: String,
}

/// Protection state change applied to one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProtectionChange {
    Protected,
    Unprotected,
    AlreadyUnprotected,
}

async fn change_protection(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    branch: &str,
    protect: bool,
) -> Result<ProtectionChange, PlatformError> {
    let current = platform.get_branch(repo, branch).await?;
    if protect {
        platform.protect_branch(repo, branch).await?;
        Ok(ProtectionChange::Protected)
    } else if current.protected {
        platform.unprotect_branch(repo, branch).await?;
        Ok(ProtectionChange::Unprotected)
    } else {
        Ok(ProtectionChange::AlreadyUnprotected)
    }
}

/// Run the protect-branch command
pub async fn run_protect_branch(ctx: &CommandContext, args: &ProtectBranchArgs) -> anyhow::Result<()> {
    Output::banner("Changing branch protection");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("branch", args.branch.clone()),
        ("protect", args.protect.to_string()),
    ]);

    let platform = ctx.connect(BRANCH_SCOPES).await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        let result = change_protection(platform.as_ref(), repo, &args.branch, args.protect).await;
        let branch = Output::branch_name(&args.branch);
        summary.record(match result {
            Ok(ProtectionChange::Protected) => {
                RepoVisitResult::Success(format!("{}: {} protected", repo.full_name, branch))
            }
            Ok(ProtectionChange::Unprotected) => {
                RepoVisitResult::Success(format!("{}: {} unprotected", repo.full_name, branch))
            }
            Ok(ProtectionChange::AlreadyUnprotected) => {
                RepoVisitResult::Skipped(format!("{}: {} is not protected", repo.full_name, branch))
            }
            Err(e) => RepoVisitResult::Error(format!("{}: {}", repo.full_name, e)),
        });
    }
    summary.finish()
}

/// Run the default-branch command
pub async fn run_default_branch(ctx: &CommandContext, args: &DefaultBranchArgs) -> anyhow::Result<()> {
    Output::banner("Changing default branch");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("branch", args.branch.clone()),
    ]);

    let platform = ctx.connect(BRANCH_SCOPES).await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        let result = platform.set_default_branch(repo, &args.branch).await;
        summary.record(RepoVisitResult::from_result(&repo.full_name, result, |_| {
            format!("default branch is now {}", Output::branch_name(&args.branch))
        }));
    }
    summary.finish()
}

/// Point `branch` at `sha` and protect it
async fn protected_branch_at(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    branch: &str,
    sha: &str,
) -> Result<(), PlatformError> {
    platform.create_or_update_branch_ref(repo, branch, sha).await?;
    platform.protect_branch(repo, branch).await
}

async fn freeze(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    branch: &str,
) -> Result<String, PlatformError> {
    let head = platform.get_branch(repo, &repo.default_branch).await?;
    protected_branch_at(platform, repo, branch, &head.sha).await?;
    Ok(head.sha)
}

/// Run the freeze command
pub async fn run_freeze(ctx: &CommandContext, args: &FreezeArgs) -> anyhow::Result<()> {
    Output::banner("Creating protected branches");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("branch", args.branch_name.clone()),
    ]);

    let platform = ctx.connect(BRANCH_SCOPES).await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        let result = freeze(platform.as_ref(), repo, &args.branch_name).await;
        summary.record(RepoVisitResult::from_result(&repo.full_name, result, |sha| {
            format!(
                "{} frozen at {}",
                Output::branch_name(&args.branch_name),
                short_sha(&sha)
            )
        }));
    }
    summary.finish()
}

/// Follow first parents from `sha` down to the root commit
pub async fn first_commit(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    sha: &str,
) -> Result<String, PlatformError> {
    let mut commit = platform.get_commit(repo, sha).await?;
    while let Some(parent) = commit.parents.first().cloned() {
        commit = platform.get_commit(repo, &parent).await?;
    }
    Ok(commit.sha)
}

async fn grading_base(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    base: &str,
) -> Result<String, PlatformError> {
    let head = platform.get_branch(repo, &repo.default_branch).await?;
    let root = first_commit(platform, repo, &head.sha).await?;
    protected_branch_at(platform, repo, base, &root).await?;
    Ok(root)
}

/// Run the grading-pr command
pub async fn run_grading_pr(ctx: &CommandContext, args: &GradingPrArgs) -> anyhow::Result<()> {
    Output::banner("Creating grading branches and pull requests");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("head", args.head.clone().unwrap_or_else(|| "(default branch)".to_string())),
        ("base", args.base.clone()),
        ("title", args.pull_request_title.clone()),
    ]);

    let platform = ctx.connect(BRANCH_SCOPES).await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        Output::header(&Output::repo_name(&repo.full_name));
        if let Err(e) = grading_base(platform.as_ref(), repo, &args.base).await {
            summary.record(RepoVisitResult::Error(format!(
                "{}: grading branch: {}",
                repo.full_name, e
            )));
            continue;
        }

        let head = args.head.as_deref().unwrap_or(&repo.default_branch);
        let result = platform
            .create_pull_request(
                repo,
                head,
                &args.base,
                &args.pull_request_title,
                &args.pull_request_body,
            )
            .await;
        summary.record(match result {
            Ok(pr) => RepoVisitResult::Success(format!("{}: pull request #{} {}", repo.full_name, pr.number, pr.url)),
            Err(PlatformError::Conflict(_)) => {
                list_open_pulls(platform.as_ref(), repo).await;
                RepoVisitResult::Skipped(format!("{}: pull request already exists", repo.full_name))
            }
            Err(e) => RepoVisitResult::Error(format!("{}: pull request: {}", repo.full_name, e)),
        });
    }
    summary.finish()
}

async fn list_open_pulls(platform: &dyn HostingPlatform, repo: &RepoHandle) {
    match platform.list_open_pull_requests(repo).await {
        Ok(pulls) => {
            for pr in pulls {
                Output::list_item(&format!("#{} {} ({} → {})", pr.number, pr.title, pr.head, pr.base));
            }
        }
        Err(e) => Output::warning(&format!("Cannot list pull requests: {}", e)),
    }
}

fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(7)]
}
