//! Pre-flight verifications
//!
//! Each check prints what it found and fails the command when the
//! repository or grading setup is not usable as is.

use clap::Subcommand;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::workflows::workflow_files;
use crate::cli::context::CommandContext;
use crate::cli::output::Output;
use crate::core::config::pick;
use crate::core::manifest::{SyncManifest, DEFAULT_MANIFEST_PATH};
use crate::core::tree::collect_files;
use crate::grading::{load_associations, parse_test_log, unassociated, DEFAULT_TEST_LOG};
use crate::platform::{HostingPlatform, PlatformError, RepoHandle, RepoName, SecretVisibility};

/// `${{ secrets.NAME }}` in a workflow file
static SECRET_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\s*\{\s*secrets\.([A-Za-z0-9_]+)").expect("secret pattern is valid")
});

#[derive(Subcommand, Debug, Clone)]
pub enum VerifyCommands {
    /// Check the token and show its scopes and remaining API calls
    Token,
    /// Check a repository is flagged as a template
    Template {
        /// Repository in format OrgName/RepoName
        #[arg(long)]
        repo: Option<String>,
    },
    /// Compare the sync manifest with the template's files
    Manifest {
        #[arg(long)]
        template_repo: Option<String>,

        #[arg(long)]
        manifest_path: Option<String>,
    },
    /// Check every secret used by the workflows is available
    Secrets {
        /// Repository in format OrgName/RepoName
        #[arg(long)]
        repo: String,
    },
    /// Check every test in a log has an association
    Grading {
        #[arg(long, default_value = DEFAULT_TEST_LOG)]
        test_log: PathBuf,

        #[arg(long)]
        test_associations_path: PathBuf,
    },
}

/// Run a verify subcommand
pub async fn run_verify(ctx: &CommandContext, action: &VerifyCommands) -> anyhow::Result<()> {
    match action {
        VerifyCommands::Token => verify_token(ctx).await,
        VerifyCommands::Template { repo } => verify_template(ctx, repo.as_deref()).await,
        VerifyCommands::Manifest {
            template_repo,
            manifest_path,
        } => verify_manifest(ctx, template_repo.as_deref(), manifest_path.clone()).await,
        VerifyCommands::Secrets { repo } => verify_secrets(ctx, repo).await,
        VerifyCommands::Grading {
            test_log,
            test_associations_path,
        } => verify_grading(test_log, test_associations_path),
    }
}

async fn verify_token(ctx: &CommandContext) -> anyhow::Result<()> {
    Output::banner("Verifying token");
    let platform = ctx.platform("repo, workflow")?;
    let status = platform.verify_token().await?;

    Output::success(&format!("Token accepted for {}", status.login));
    Output::kv(
        "scopes",
        &if status.scopes.is_empty() {
            "(none reported)".to_string()
        } else {
            status.scopes.join(", ")
        },
    );
    Output::kv("rate limit", &status.rate_limit.describe());
    Ok(())
}

async fn verify_template(ctx: &CommandContext, repo: Option<&str>) -> anyhow::Result<()> {
    Output::banner("Verifying template repository");
    let name = ctx.template(repo)?;
    Output::args(&[("repo", name.to_string())]);

    let platform = ctx.connect("repo").await?;
    let repo = platform.get_repository(&name).await?;
    if !repo.is_template {
        anyhow::bail!(
            "{} is not a template repository; enable \"Template repository\" in its settings",
            repo.full_name
        );
    }
    Output::success(&format!("{} is a template repository", repo.full_name));
    Ok(())
}

async fn verify_manifest(
    ctx: &CommandContext,
    template: Option<&str>,
    manifest_path: Option<String>,
) -> anyhow::Result<()> {
    Output::banner("Verifying sync manifest");
    let name = ctx.template(template)?;
    let manifest_path = pick(manifest_path, &ctx.config.manifest_path)
        .unwrap_or_else(|| DEFAULT_MANIFEST_PATH.to_string());
    Output::args(&[
        ("template", name.to_string()),
        ("manifest", manifest_path.clone()),
    ]);

    let platform = ctx.connect("repo").await?;
    let template = platform.get_repository(&name).await?;
    let manifest = SyncManifest::resolve(platform.as_ref(), &template, &[], &manifest_path).await?;
    let entries = collect_files(platform.as_ref(), &template, "").await?;
    let check = manifest.check(entries.iter().map(|e| e.path.as_str()));

    Output::header(&format!("From repository: {}", template.full_name));
    for path in &check.found {
        Output::success(&format!("Found: {}", path));
    }
    for path in &check.not_included {
        Output::warning(&format!("Not included: {}", path));
    }
    for path in &check.missing {
        Output::error(&format!("Missing: {}", path));
    }

    if !check.is_ok() {
        anyhow::bail!("{} missing or incorrect paths", check.missing.len());
    }
    Ok(())
}

/// Secret names referenced by a workflow file
pub fn required_secrets(workflow: &str) -> BTreeSet<String> {
    SECRET_REF
        .captures_iter(workflow)
        .map(|c| c[1].to_string())
        .collect()
}

/// Repository secrets plus organization secrets visible to `repo`
pub async fn available_secrets(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
) -> Result<BTreeSet<String>, PlatformError> {
    let mut available: BTreeSet<String> = platform.list_repo_secrets(repo).await?.into_iter().collect();

    for secret in platform.list_org_secrets(&repo.owner).await? {
        let visible = match secret.visibility {
            SecretVisibility::All => true,
            SecretVisibility::Private => repo.private,
            SecretVisibility::Selected => platform
                .list_secret_repositories(&repo.owner, &secret.name)
                .await?
                .iter()
                .any(|full_name| full_name == &repo.full_name),
        };
        if visible {
            available.insert(secret.name);
        }
    }
    Ok(available)
}

async fn verify_secrets(ctx: &CommandContext, repo: &str) -> anyhow::Result<()> {
    Output::banner("Verifying access to secrets");
    let name: RepoName = repo.parse().map_err(anyhow::Error::msg)?;
    Output::args(&[("repo", name.to_string())]);

    let platform = ctx.connect("repo, admin:org").await?;
    let repo = platform.get_repository(&name).await?;

    let mut required = BTreeSet::new();
    for entry in workflow_files(platform.as_ref(), &repo).await? {
        let file = platform.get_file(&repo, &entry.path, None).await?;
        let secrets = required_secrets(&String::from_utf8_lossy(&file.content));
        Output::header(&format!("Workflow {} requires access to:", file.path));
        for secret in &secrets {
            Output::list_item(secret);
        }
        required.extend(secrets);
    }

    let available = available_secrets(platform.as_ref(), &repo).await?;
    Output::header(&format!("{} has access to:", repo.full_name));
    for secret in &available {
        Output::list_item(secret);
    }

    let missing: Vec<&String> = required.difference(&available).collect();
    if !missing.is_empty() {
        for secret in &missing {
            Output::error(&format!("No access to {}", secret));
        }
        anyhow::bail!("{} cannot read {} required secrets", repo.full_name, missing.len());
    }
    Output::success("All required secrets are available");
    Ok(())
}

fn verify_grading(test_log: &Path, associations_path: &Path) -> anyhow::Result<()> {
    Output::banner("Verifying test log and test associations");
    Output::args(&[
        ("test log", test_log.display().to_string()),
        ("test associations", associations_path.display().to_string()),
    ]);

    let log = std::fs::read_to_string(test_log)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", test_log.display(), e))?;
    let results = parse_test_log(&log);
    let associations = load_associations(associations_path)?;
    Output::info(&format!("{} test results", results.len()));

    let orphans = unassociated(&results, &associations);
    if !orphans.is_empty() {
        for name in &orphans {
            Output::error(&format!("No association for {}", name));
        }
        anyhow::bail!("{} tests have no association", orphans.len());
    }
    Output::success("Every test has an association");
    Ok(())
}
