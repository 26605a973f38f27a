//! GitHub Actions maintenance across student repositories
//!
//! `update-workflows` replaces the workflow files from the template,
//! `delete-runs` prunes run history.

use std::collections::{BTreeMap, HashMap};

use crate::cli::batch::{BatchSummary, RepoVisitResult};
use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::Output;
use crate::core::copier::{sync_repository, CopyOptions};
use crate::core::tree::collect_files;
use crate::platform::{
    ContentEntry, HostingPlatform, PlatformError, RemoteFile, RepoHandle, WorkflowRun,
};

/// Directory GitHub Actions reads workflows from
pub const WORKFLOWS_DIR: &str = ".github/workflows";

const WORKFLOW_SCOPES: &str = "repo, workflow";

#[derive(clap::Args, Debug, Clone)]
pub struct UpdateWorkflowsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Delete every existing workflow file first
    #[arg(long)]
    pub delete_previous_workflows: bool,

    /// Template repository whose workflows are copied (OrgName/RepoName)
    #[arg(long)]
    pub template_repo: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DeleteRunsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Only delete completed runs that failed
    #[arg(long)]
    pub only_failed: bool,

    /// Only touch workflows whose name contains this
    #[arg(long)]
    pub workflow_filter: Option<String>,
}

/// Workflow files of a repository; none when the directory is absent
pub async fn workflow_files(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
) -> Result<Vec<ContentEntry>, PlatformError> {
    match collect_files(platform, repo, WORKFLOWS_DIR).await {
        Err(PlatformError::NotFound(_)) => Ok(Vec::new()),
        other => other,
    }
}

async fn delete_workflows(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
) -> Result<usize, PlatformError> {
    let entries = workflow_files(platform, repo).await?;
    for entry in &entries {
        platform
            .delete_file(
                repo,
                &entry.path,
                &format!("Delete {}", entry.path),
                &entry.sha,
                &repo.default_branch,
            )
            .await?;
    }
    Ok(entries.len())
}

async fn template_workflows(
    platform: &dyn HostingPlatform,
    template: &RepoHandle,
) -> Result<Vec<RemoteFile>, PlatformError> {
    let mut files = Vec::new();
    for entry in workflow_files(platform, template).await? {
        files.push(platform.get_file(template, &entry.path, None).await?);
    }
    Ok(files)
}

/// Run the update-workflows command
pub async fn run_update_workflows(
    ctx: &CommandContext,
    args: &UpdateWorkflowsArgs,
) -> anyhow::Result<()> {
    Output::banner("Updating workflows");
    let template_name = match args.template_repo.as_deref() {
        Some(flag) => Some(ctx.template(Some(flag))?),
        None => ctx.template(None).ok(),
    };
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("delete previous", args.delete_previous_workflows.to_string()),
        (
            "template",
            template_name.as_ref().map(|t| t.to_string()).unwrap_or_default(),
        ),
    ]);

    let platform = ctx.connect(WORKFLOW_SCOPES).await?;
    let files = match &template_name {
        Some(name) => {
            let template = platform.get_repository(name).await?;
            template_workflows(platform.as_ref(), &template).await?
        }
        None => Vec::new(),
    };
    for file in &files {
        Output::list_item(&file.path);
    }
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let options = CopyOptions {
        branch: None,
        message: "Update workflows",
    };
    let mut summary = BatchSummary::new();
    for repo in &repos {
        if args.delete_previous_workflows {
            if let Err(e) = delete_workflows(platform.as_ref(), repo).await {
                summary.record(RepoVisitResult::Error(format!(
                    "{}: deleting workflows: {}",
                    repo.full_name, e
                )));
                continue;
            }
        }

        let outcome = sync_repository(platform.as_ref(), repo, &files, &options).await;
        summary.record(if outcome.has_failures() {
            let failed: Vec<String> = outcome
                .files
                .iter()
                .filter_map(|f| f.result.as_ref().err().map(|e| format!("{} ({})", f.path, e)))
                .collect();
            RepoVisitResult::Error(format!("{}: {}", repo.full_name, failed.join(", ")))
        } else {
            RepoVisitResult::Success(format!("{}: {} workflows", repo.full_name, outcome.files.len()))
        });
    }
    summary.finish()
}

/// Runs to delete, grouped by workflow name.
///
/// Only workflows with more than one run are considered. With
/// `only_failed`, completed failed runs go; otherwise everything but the
/// newest run goes.
pub fn runs_to_delete<'a>(
    runs: &'a [WorkflowRun],
    names: &HashMap<u64, String>,
    only_failed: bool,
    workflow_filter: Option<&str>,
) -> Vec<(String, &'a WorkflowRun)> {
    let mut groups: BTreeMap<String, Vec<&WorkflowRun>> = BTreeMap::new();
    for run in runs {
        let name = names
            .get(&run.workflow_id)
            .cloned()
            .or_else(|| run.name.clone())
            .unwrap_or_else(|| run.workflow_id.to_string());
        groups.entry(name).or_default().push(run);
    }

    let mut doomed = Vec::new();
    for (name, mut group) in groups {
        if group.len() < 2 || workflow_filter.is_some_and(|f| !name.contains(f)) {
            continue;
        }
        group.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let selected: Vec<&WorkflowRun> = if only_failed {
            group.into_iter().filter(|r| r.is_failed()).collect()
        } else {
            group.into_iter().skip(1).collect()
        };
        doomed.extend(selected.into_iter().map(|run| (name.clone(), run)));
    }
    doomed
}

async fn prune_runs(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    args: &DeleteRunsArgs,
) -> Result<(usize, usize), PlatformError> {
    let names: HashMap<u64, String> = platform
        .list_workflows(repo)
        .await?
        .into_iter()
        .map(|w| (w.id, w.name))
        .collect();
    let runs = platform.list_workflow_runs(repo).await?;

    let mut deleted = 0;
    let mut failed = 0;
    for (name, run) in runs_to_delete(&runs, &names, args.only_failed, args.workflow_filter.as_deref()) {
        match platform.delete_workflow_run(repo, run.id).await {
            Ok(()) => {
                println!("  {}\t{} #{}", Output::status("Success"), name, run.id);
                deleted += 1;
            }
            Err(e) => {
                println!("  {}\t{} #{}: {}", Output::status("Failed"), name, run.id, e);
                failed += 1;
            }
        }
    }
    Ok((deleted, failed))
}

/// Run the delete-runs command
pub async fn run_delete_runs(ctx: &CommandContext, args: &DeleteRunsArgs) -> anyhow::Result<()> {
    Output::banner("Deleting workflow runs");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("only failed", args.only_failed.to_string()),
        ("workflow filter", args.workflow_filter.clone().unwrap_or_default()),
    ]);

    let platform = ctx.connect(WORKFLOW_SCOPES).await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let mut summary = BatchSummary::new();
    for repo in &repos {
        Output::header(&Output::repo_name(&repo.full_name));
        summary.record(match prune_runs(platform.as_ref(), repo, args).await {
            Ok((0, 0)) => RepoVisitResult::Skipped(format!("{}: nothing to delete", repo.full_name)),
            Ok((deleted, 0)) => {
                RepoVisitResult::Success(format!("{}: {} runs deleted", repo.full_name, deleted))
            }
            Ok((deleted, failed)) => RepoVisitResult::Error(format!(
                "{}: {} runs deleted, {} failed",
                repo.full_name, deleted, failed
            )),
            Err(e) => RepoVisitResult::Error(format!("{}: {}", repo.full_name, e)),
        });
    }
    summary.finish()
}
