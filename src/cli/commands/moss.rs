//! Moss command implementation
//!
//! Sends student files to MOSS, then archives the report page in the
//! current working copy.

use anyhow::Context;
use std::path::{Path, PathBuf};

use crate::cli::context::{CommandContext, TargetArgs};
use crate::cli::output::Output;
use crate::git;
use crate::plagiarism::collect::{base_files, student_files};
use crate::plagiarism::moss::{report_path, save_report, MossClient, MossOptions, MOSS_SERVER};
use crate::platform::RepoName;

#[derive(clap::Args, Debug, Clone)]
pub struct MossArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// MOSS user id, see http://theory.stanford.edu/~aiken/moss/
    #[arg(long, env = "MOSS_USER_ID", hide_env_values = true)]
    pub user_id: String,

    /// Name of the archived report
    #[arg(long, default_value = "report")]
    pub report_name: String,

    /// Repository holding the base files, in format Owner/RepoName
    #[arg(long)]
    pub base_files_repo: Option<String>,

    /// Files (or glob patterns) in the student repositories
    #[arg(long, num_args = 1.., required = true)]
    pub paths: Vec<String>,

    /// Language of the submissions
    #[arg(short = 'l', long, default_value = "python")]
    pub language: String,

    /// Ignore passages appearing in more than this many programs
    #[arg(short = 'm', long, default_value_t = 10)]
    pub ignore_limit: u32,

    /// Comment attached to the report
    #[arg(short = 'c', long, default_value = "")]
    pub comment: String,

    /// Number of matching files shown
    #[arg(short = 'n', long, default_value_t = 250)]
    pub matches_shown: u32,

    /// Submissions are directories
    #[arg(short = 'd', long)]
    pub directory_mode: bool,

    /// Use the experimental server
    #[arg(short = 'x', long)]
    pub experimental: bool,

    /// Working copy the report is committed to
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Directory of the reports, relative to the working copy
    #[arg(long, default_value = "moss_reports")]
    pub reports_dir: PathBuf,

    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// MOSS server address
    #[arg(long, default_value = MOSS_SERVER, hide = true)]
    pub server: String,
}

impl MossArgs {
    fn options(&self) -> MossOptions {
        MossOptions {
            user_id: self.user_id.clone(),
            language: self.language.clone(),
            ignore_limit: self.ignore_limit,
            comment: self.comment.clone(),
            matches_shown: self.matches_shown,
            directory_mode: self.directory_mode,
            experimental: self.experimental,
        }
    }
}

/// Run the moss command
pub async fn run_moss(ctx: &CommandContext, args: &MossArgs) -> anyhow::Result<()> {
    Output::banner("Submitting files to Moss");
    Output::args(&[
        ("org", ctx.org(args.target.org.as_deref())?),
        ("repo filter", ctx.repo_filter(args.target.repo_filter.as_deref())?),
        ("report", args.report_name.clone()),
        ("base files repo", args.base_files_repo.clone().unwrap_or_default()),
        ("paths", args.paths.join(", ")),
        ("language", args.language.clone()),
    ]);

    let client = MossClient::new(args.options())?.with_server(&args.server);
    let platform = ctx.connect("repo").await?;
    let repos = ctx.target_repositories(platform.as_ref(), &args.target).await?;

    let base = match &args.base_files_repo {
        Some(name) => {
            let name: RepoName = name.parse().map_err(anyhow::Error::msg)?;
            let repo = platform.get_repository(&name).await?;
            Output::header(&format!("Base files from {}", repo.full_name));
            let files = base_files(platform.as_ref(), &repo, &args.paths).await?;
            for file in &files {
                Output::list_item(&file.display_name);
            }
            files
        }
        None => Vec::new(),
    };

    Output::header("Student files");
    let (files, skipped) = student_files(platform.as_ref(), &repos, &args.paths).await?;
    for file in &files {
        Output::list_item(&file.display_name);
    }
    for entry in &skipped {
        Output::warning(&format!("Skipped {}", entry));
    }
    if files.is_empty() {
        anyhow::bail!("No student files to submit");
    }

    let spinner = Output::spinner(&format!("Uploading {} files to MOSS...", files.len()));
    let url = client.submit(&base, &files).await;
    spinner.finish_and_clear();
    let url = url?;
    Output::success(&format!("Report url: {}", url));

    let relative = archive_report(args, &url).await?;
    Output::success(&format!("Report copy located at: {}", relative.display()));
    Ok(())
}

/// Download the report into the working copy, commit it, pull and push
async fn archive_report(args: &MossArgs, url: &str) -> anyhow::Result<PathBuf> {
    let relative = report_path(&args.reports_dir, &args.report_name, chrono::Local::now());
    let absolute = args.workdir.join(&relative);
    let http = reqwest::Client::new();
    save_report(&http, url, &absolute).await?;

    commit_report(&args.workdir, &relative, &args.report_name, &args.remote)
        .with_context(|| format!("Report saved to {} but not pushed", absolute.display()))?;
    Ok(relative)
}

fn commit_report(workdir: &Path, relative: &Path, name: &str, remote: &str) -> Result<(), git::GitError> {
    let repo = git::open_repo(workdir)?;
    git::stage_paths(&repo, &[relative])?;
    git::commit_staged(&repo, &format!("Moss report: {}", name))?;
    git::pull_rebase(&repo, remote)?;
    git::push_head(&repo, remote)
}
