//! Sync command implementation
//!
//! Copies the template files listed in the sync manifest into every
//! student repository, or into one local working copy.

use std::path::PathBuf;

use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::{Output, Table};
use crate::core::config::pick;
use crate::core::copier::{fetch_manifest_files, BatchOutcome, CopyOptions, RepoOutcome};
use crate::core::delivery::{deliver, DeliveryReport, DeliveryTarget, LocalDelivery};
use crate::core::manifest::{SyncManifest, DEFAULT_MANIFEST_PATH};

pub const SYNC_SCOPES: &str = "repo, workflow";

#[derive(clap::Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Template repository in format OrgName/RepoName
    #[arg(long)]
    pub template_repo: Option<String>,

    /// Files to sync; overrides the manifest file of the template
    #[arg(long, num_args = 1..)]
    pub files: Vec<String>,

    /// Manifest file inside the template repository
    #[arg(long)]
    pub manifest_path: Option<String>,

    /// Branch written in each student repository (default: its default branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Write into this local working copy, then commit, pull and push
    #[arg(long, value_name = "DIR")]
    pub local: Option<PathBuf>,

    /// Remote pushed to with --local
    #[arg(long, default_value = "origin", requires = "local")]
    pub remote: String,
}

/// Run the sync command
pub async fn run_sync(ctx: &CommandContext, args: &SyncArgs) -> anyhow::Result<()> {
    Output::banner("Syncing template files");

    let template_name = ctx.template(args.template_repo.as_deref())?;
    let manifest_path = pick(args.manifest_path.clone(), &ctx.config.manifest_path)
        .unwrap_or_else(|| DEFAULT_MANIFEST_PATH.to_string());
    let branch = pick(args.branch.clone(), &ctx.config.branch);

    let target = match &args.local {
        Some(workdir) => DeliveryTarget::Local {
            workdir: workdir.clone(),
            remote: args.remote.clone(),
        },
        None => DeliveryTarget::Api {
            org: ctx.org(args.target.org.as_deref())?,
            filter: ctx.repo_filter(args.target.repo_filter.as_deref())?,
        },
    };

    let mut echo = vec![("template", template_name.to_string())];
    match &target {
        DeliveryTarget::Api { org, filter } => {
            echo.push(("org", org.clone()));
            echo.push(("repo filter", filter.clone()));
        }
        DeliveryTarget::Local { workdir, remote } => {
            echo.push(("working copy", workdir.display().to_string()));
            echo.push(("remote", remote.clone()));
        }
    }
    if args.files.is_empty() {
        echo.push(("manifest", manifest_path.clone()));
    } else {
        echo.push(("files", args.files.join(", ")));
    }
    if let Some(branch) = &branch {
        echo.push(("branch", branch.clone()));
    }
    Output::args(&echo);

    let platform = ctx.connect(SYNC_SCOPES).await?;
    let template = platform.get_repository(&template_name).await?;

    let manifest =
        SyncManifest::resolve(platform.as_ref(), &template, &args.files, &manifest_path).await?;
    Output::info(&format!("{} paths in the sync manifest", manifest.len()));

    let spinner = Output::spinner(&format!("Reading {}...", template.full_name));
    let fetched = fetch_manifest_files(platform.as_ref(), &template, &manifest).await;
    spinner.finish_and_clear();
    let fetched = fetched?;

    for path in &fetched.missing {
        Output::warning(&format!("{} is not in {}", path, template.full_name));
    }
    if fetched.files.is_empty() {
        Output::warning("Nothing to sync");
        return Ok(());
    }

    let options = CopyOptions {
        branch: branch.as_deref(),
        ..CopyOptions::default()
    };
    let report = deliver(
        platform.as_ref(),
        &fetched.files,
        &target,
        &options,
        &mut print_repo_outcome,
    )
    .await?;

    match report {
        DeliveryReport::Api(batch) => finish_batch(&batch),
        DeliveryReport::Local(local) => {
            print_local(&local);
            Ok(())
        }
    }
}

fn print_repo_outcome(outcome: &RepoOutcome) {
    Output::header(&Output::repo_name(&outcome.repo));
    for file in &outcome.files {
        match &file.result {
            Ok(copy) => println!("  {} {}", Output::status(&copy.to_string()), file.path),
            Err(e) => Output::error(&format!("{}: {}", file.path, e)),
        }
    }
}

fn finish_batch(batch: &BatchOutcome) -> anyhow::Result<()> {
    use crate::core::copier::CopyOutcome::{Created, Unchanged, Updated};

    Output::header("Summary");
    let mut table = Table::new(vec!["Repository", "Created", "Updated", "Unchanged", "Failed"]);
    for repo in &batch.repos {
        table.add_row(vec![
            repo.repo.clone(),
            repo.count(Created).to_string(),
            repo.count(Updated).to_string(),
            repo.count(Unchanged).to_string(),
            repo.failures().to_string(),
        ]);
    }
    table.print();

    if batch.has_failures() {
        anyhow::bail!("{} files failed to sync", batch.failures());
    }
    Output::success(&format!("Synced {} repositories", batch.repos.len()));
    Ok(())
}

fn print_local(local: &LocalDelivery) {
    for path in &local.written {
        Output::list_item(path);
    }
    match &local.commit {
        Some(id) => Output::success(&format!("Committed {} and pushed", &id[..id.len().min(7)])),
        None => Output::success("Nothing new to commit; pushed"),
    }
}
