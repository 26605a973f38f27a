//! Permissions command implementation
//!
//! Sets every non-admin collaborator and every team of the matching
//! repositories to one permission level, then re-reads the repositories
//! to confirm the change.

use crate::cli::batch::{BatchSummary, RepoVisitResult};
use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::Output;
use crate::platform::{
    Collaborator, HostingPlatform, PermissionLevel, PlatformError, RepoHandle, Team,
};

#[derive(clap::Args, Debug, Clone)]
pub struct PermissionsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Pull (read-only) or push (read, write)
    #[arg(long, value_enum, default_value_t = PermissionLevel::Pull)]
    pub new_permission_level: PermissionLevel,
}

/// Confirmation counts over a set of repositories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCheck {
    pub ok: usize,
    /// `collaborator alice: push` style descriptions of wrong entries
    pub failed: Vec<String>,
}

impl PermissionCheck {
    /// Compare collaborators and teams of one repository to `level`
    pub fn inspect(&mut self, collaborators: &[Collaborator], teams: &[Team], level: PermissionLevel) {
        for collaborator in collaborators.iter().filter(|c| !c.permissions.admin) {
            if collaborator.permissions.grants(level) {
                self.ok += 1;
            } else {
                self.failed.push(format!(
                    "collaborator {}: {:?}",
                    collaborator.login, collaborator.permissions
                ));
            }
        }
        for team in teams {
            let permission = team.permission.as_deref().unwrap_or("none");
            if permission == level.to_string() {
                self.ok += 1;
            } else {
                self.failed.push(format!("team {}: {}", team.name, permission));
            }
        }
    }
}

async fn apply(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    level: PermissionLevel,
) -> Result<usize, PlatformError> {
    let mut changed = 0;
    for collaborator in platform.list_collaborators(repo).await? {
        if !collaborator.permissions.admin {
            platform.add_collaborator(repo, &collaborator.login, level).await?;
            changed += 1;
        }
    }
    for team in platform.list_repo_teams(repo).await? {
        platform
            .set_team_permission(&repo.owner, &team.slug, repo, level)
            .await?;
        changed += 1;
    }
    Ok(changed)
}

/// Re-read every repository and compare it to `level`. A repository
/// that can't be listed becomes a failed entry.
pub async fn confirm(
    platform: &dyn HostingPlatform,
    repos: &[RepoHandle],
    level: PermissionLevel,
) -> PermissionCheck {
    let mut check = PermissionCheck::default();
    for repo in repos {
        let listed = match platform.list_collaborators(repo).await {
            Ok(collaborators) => platform
                .list_repo_teams(repo)
                .await
                .map(|teams| (collaborators, teams)),
            Err(e) => Err(e),
        };
        let (collaborators, teams) = match listed {
            Ok(listed) => listed,
            Err(e) => {
                check.failed.push(format!("{}: {}", repo.full_name, e));
                continue;
            }
        };
        let before = check.failed.len();
        check.inspect(&collaborators, &teams, level);
        for failure in &mut check.failed[before..] {
            *failure = format!("{}: {}", repo.full_name, failure);
        }
    }
    check
}

/// Run the permissions command
pub async fn run_permissions(ctx: &CommandContext, args: &PermissionsArgs) -> anyhow::Result<()> {
    Output::banner("Changing access permissions");
    let level = args.new_permission_level;
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("new permission", level.to_string()),
    ]);

    let platform = ctx.connect("repo").await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        let result = apply(platform.as_ref(), repo, level).await;
        summary.record(RepoVisitResult::from_result(&repo.full_name, result, |n| {
            format!("{} entries set to {}", n, level)
        }));
    }

    Output::header("Confirming changes");
    let check = confirm(platform.as_ref(), &repos, level).await;
    for failure in &check.failed {
        Output::error(failure);
    }
    Output::kv("repositories", &repos.len().to_string());
    Output::kv("confirmed", &check.ok.to_string());
    Output::kv("not applied", &check.failed.len().to_string());

    if !check.failed.is_empty() {
        summary.print();
        anyhow::bail!("Couldn't apply permission changes");
    }
    summary.finish()
}
