//! Repository creation from a template
//!
//! `create-repo` creates one student repository, `create-test-repos`
//! creates a numbered set for trying workflows at scale.

use thiserror::Error;

use crate::cli::batch::{BatchSummary, RepoVisitResult};
use crate::cli::context::CommandContext;
use crate::cli::output::Output;
use crate::platform::{HostingPlatform, PermissionLevel, PlatformError, RepoHandle, RepoName};

const CREATE_SCOPES: &str = "repo, workflow";

/// Description of repositories made by `create-test-repos`
pub const TEST_REPO_DESCRIPTION: &str = "Repository for testing classroom features at scale";

#[derive(Error, Debug)]
pub enum CreateRepoError {
    #[error("Failed to create {repo}: {message}")]
    Failed { repo: String, message: String },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// What creating a repository amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    Created,
    AlreadyExists,
}

/// Collaborators and team to grant access to a new repository
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AccessArgs {
    /// Collaborator usernames to receive admin access
    #[arg(long, num_args = 0..)]
    pub admin_collaborators: Vec<String>,

    /// Collaborator usernames to receive write access
    #[arg(long, num_args = 0..)]
    pub write_collaborators: Vec<String>,

    /// Team name to receive write access
    #[arg(long)]
    pub team_name: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateRepoArgs {
    /// Organization that owns the new repository
    #[arg(long)]
    pub org: Option<String>,

    /// Template repository in format OrgName/RepoName
    #[arg(long)]
    pub template_repo: Option<String>,

    /// Name of the repository to create
    #[arg(long)]
    pub repo_name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Create a private repository
    #[arg(long)]
    pub private: bool,

    #[command(flatten)]
    pub access: AccessArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateTestReposArgs {
    #[arg(long)]
    pub org: Option<String>,

    #[arg(long)]
    pub template_repo: Option<String>,

    /// Assignment prefix; repositories are named `{filter}-{prefix}{i}`
    #[arg(long)]
    pub repo_filter: Option<String>,

    /// Number of repositories to create
    #[arg(long, default_value_t = 10)]
    pub num_repos: u32,

    /// Student name prefix
    #[arg(long, default_value = "PolyStudent")]
    pub prefix: String,

    #[arg(long)]
    pub private: bool,

    #[command(flatten)]
    pub access: AccessArgs,
}

/// Generate `org/name` from `template`.
///
/// A failed generation is checked against the target: if the repository
/// exists the call counts as [`Creation::AlreadyExists`].
pub async fn create_from_template(
    platform: &dyn HostingPlatform,
    template: &RepoName,
    org: &str,
    name: &str,
    description: &str,
    private: bool,
) -> Result<Creation, CreateRepoError> {
    let err = match platform
        .generate_from_template(template, org, name, description, private)
        .await
    {
        Ok(()) => return Ok(Creation::Created),
        Err(e) => e,
    };

    match platform.get_repository(&RepoName::new(org, name)).await {
        Ok(_) => Ok(Creation::AlreadyExists),
        Err(_) => Err(CreateRepoError::Failed {
            repo: format!("{}/{}", org, name),
            message: err.to_string(),
        }),
    }
}

/// Add admin and write collaborators, then grant `push` to the team
pub async fn grant_access(
    platform: &dyn HostingPlatform,
    org: &str,
    repo: &RepoHandle,
    access: &AccessArgs,
) -> Result<(), PlatformError> {
    for login in &access.admin_collaborators {
        platform
            .add_collaborator(repo, login, PermissionLevel::Admin)
            .await?;
    }
    for login in &access.write_collaborators {
        platform
            .add_collaborator(repo, login, PermissionLevel::Push)
            .await?;
    }

    if let Some(team_name) = &access.team_name {
        let teams = platform.list_org_teams(org).await?;
        match teams.iter().find(|t| &t.name == team_name) {
            Some(team) => {
                platform
                    .set_team_permission(org, &team.slug, repo, PermissionLevel::Push)
                    .await?
            }
            None => Output::warning(&format!("No team named '{}' in {}", team_name, org)),
        }
    }
    Ok(())
}

async fn create_and_grant(
    platform: &dyn HostingPlatform,
    template: &RepoName,
    org: &str,
    name: &str,
    description: &str,
    private: bool,
    access: &AccessArgs,
) -> Result<Creation, CreateRepoError> {
    let creation = create_from_template(platform, template, org, name, description, private).await?;
    let repo = platform.get_repository(&RepoName::new(org, name)).await?;
    grant_access(platform, org, &repo, access).await?;
    Ok(creation)
}

fn describe(name: &str, creation: Creation) -> RepoVisitResult {
    match creation {
        Creation::Created => RepoVisitResult::Success(format!("Created repo: {}", name)),
        Creation::AlreadyExists => RepoVisitResult::Skipped(format!("Repo already exists: {}", name)),
    }
}

/// Report whether the template repository is usable as one
async fn check_template(platform: &dyn HostingPlatform, template: &RepoName) {
    match platform.get_repository(template).await {
        Ok(repo) if repo.is_template => {
            Output::info(&format!("{} is a template repository", template))
        }
        Ok(_) => Output::error(&format!(
            "{} is not a template repository; enable \"Template repository\" in its settings",
            template
        )),
        Err(e) => Output::error(&format!("Cannot read template {}: {}", template, e)),
    }
}

/// Run the create-repo command
pub async fn run_create_repo(ctx: &CommandContext, args: &CreateRepoArgs) -> anyhow::Result<()> {
    Output::banner("Creating student repository");
    let org = ctx.org(args.org.as_deref())?;
    let template = ctx.template(args.template_repo.as_deref())?;
    Output::args(&[
        ("org", org.clone()),
        ("template", template.to_string()),
        ("repo name", args.repo_name.clone()),
        ("private", args.private.to_string()),
        ("admin collaborators", args.access.admin_collaborators.join(", ")),
        ("write collaborators", args.access.write_collaborators.join(", ")),
        ("team", args.access.team_name.clone().unwrap_or_default()),
    ]);

    let platform = ctx.connect(CREATE_SCOPES).await?;
    let result = create_and_grant(
        platform.as_ref(),
        &template,
        &org,
        &args.repo_name,
        &args.description,
        args.private,
        &args.access,
    )
    .await;

    match result {
        Ok(Creation::Created) => {
            Output::success(&format!("Created repo: {}", args.repo_name));
            Ok(())
        }
        Ok(Creation::AlreadyExists) => {
            Output::warning(&format!("Repo already exists: {}", args.repo_name));
            Ok(())
        }
        Err(e) => {
            Output::error(&e.to_string());
            check_template(platform.as_ref(), &template).await;
            Err(e.into())
        }
    }
}

/// Run the create-test-repos command
pub async fn run_create_test_repos(
    ctx: &CommandContext,
    args: &CreateTestReposArgs,
) -> anyhow::Result<()> {
    Output::banner("Creating test repositories");
    let org = ctx.org(args.org.as_deref())?;
    let template = ctx.template(args.template_repo.as_deref())?;
    let filter = ctx.repo_filter(args.repo_filter.as_deref())?;
    Output::args(&[
        ("org", org.clone()),
        ("template", template.to_string()),
        ("repo filter", filter.clone()),
        ("count", args.num_repos.to_string()),
        ("private", args.private.to_string()),
    ]);

    let platform = ctx.connect(CREATE_SCOPES).await?;
    let mut summary = BatchSummary::new();
    for name in test_repo_names(&filter, &args.prefix, args.num_repos) {
        let result = create_and_grant(
            platform.as_ref(),
            &template,
            &org,
            &name,
            TEST_REPO_DESCRIPTION,
            args.private,
            &args.access,
        )
        .await;
        summary.record(match result {
            Ok(creation) => describe(&name, creation),
            Err(e) => RepoVisitResult::Error(e.to_string()),
        });
    }

    if summary.has_failures() {
        check_template(platform.as_ref(), &template).await;
    }
    summary.finish()
}

/// `{filter}-{prefix}{i}` for `i` in `1..=count`
pub fn test_repo_names(filter: &str, prefix: &str, count: u32) -> Vec<String> {
    (1..=count)
        .map(|i| format!("{}-{}{}", filter, prefix, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_names_are_numbered_from_one() {
        assert_eq!(
            test_repo_names("hw1", "PolyStudent", 3),
            vec!["hw1-PolyStudent1", "hw1-PolyStudent2", "hw1-PolyStudent3"]
        );
        assert!(test_repo_names("hw1", "PolyStudent", 0).is_empty());
    }

    #[test]
    fn test_existing_repo_is_skipped_not_failed() {
        assert!(matches!(
            describe("hw1-alice", Creation::AlreadyExists),
            RepoVisitResult::Skipped(_)
        ));
        assert!(matches!(
            describe("hw1-alice", Creation::Created),
            RepoVisitResult::Success(_)
        ));
    }
}
