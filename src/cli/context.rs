//! Command context passed to command handlers
//!
//! Bundles the global CLI flags and the course defaults file into a single
//! struct, so command handlers resolve the organization, filter and
//! template the same way.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::Output;
use crate::core::config::{pick, ClassroomConfig};
use crate::core::directory::find_repositories;
use crate::platform::{
    get_platform_adapter, resolve_token, HostingPlatform, RepoHandle, RepoName,
};

/// Flags accepted by every subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// GitHub personal access token (falls back to GH_TOKEN)
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub REST endpoint
    #[arg(long, global = true, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Course defaults file (default: nearest .classroom.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug events, including every HTTP request and git command
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Organization and repository filter of a batch workflow
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// GitHub organization with the student repositories
    #[arg(long)]
    pub org: Option<String>,

    /// Substring selecting the repositories of one assignment
    #[arg(long)]
    pub repo_filter: Option<String>,
}

/// Context available to all command handlers.
///
/// Created once in `main()`, then passed by reference to every command.
pub struct CommandContext {
    pub token: Option<String>,
    pub api_url: Option<String>,
    /// Values from `.classroom.yaml`; flags win
    pub config: ClassroomConfig,
    pub verbose: bool,
}

impl CommandContext {
    /// Load the defaults file named by `--config`, or the nearest one
    pub fn load(globals: &GlobalArgs) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let config = ClassroomConfig::discover(globals.config.as_deref(), &cwd)?;
        Ok(Self::new(globals, config))
    }

    pub fn new(globals: &GlobalArgs, config: ClassroomConfig) -> Self {
        Self {
            token: globals.token.clone(),
            api_url: pick(globals.api_url.clone(), &config.api_url),
            config,
            verbose: globals.verbose,
        }
    }

    /// Build the platform adapter; fails when no token is available
    pub fn platform(&self, needed_scopes: &str) -> anyhow::Result<Arc<dyn HostingPlatform>> {
        let token = resolve_token(self.token.as_deref(), needed_scopes)?;
        Ok(get_platform_adapter(self.api_url.as_deref(), &token))
    }

    /// Check the token before doing anything else
    pub async fn connect(&self, needed_scopes: &str) -> anyhow::Result<Arc<dyn HostingPlatform>> {
        let platform = self.platform(needed_scopes)?;
        let status = platform
            .verify_token()
            .await
            .with_context(|| format!("Token rejected; it needs the scopes: {}", needed_scopes))?;
        Output::success(&format!("Authenticated as {}", status.login));
        Ok(platform)
    }

    pub fn org(&self, flag: Option<&str>) -> anyhow::Result<String> {
        pick(flag.map(String::from), &self.config.org)
            .context("No organization given: pass --org or set `org` in .classroom.yaml")
    }

    pub fn repo_filter(&self, flag: Option<&str>) -> anyhow::Result<String> {
        pick(flag.map(String::from), &self.config.repo_filter).context(
            "No repository filter given: pass --repo-filter or set `repo_filter` in .classroom.yaml",
        )
    }

    /// `Org/Name` of the template repository
    pub fn template(&self, flag: Option<&str>) -> anyhow::Result<RepoName> {
        let raw = pick(flag.map(String::from), &self.config.template_repo).context(
            "No template repository given: pass --template-repo or set `template_repo` in .classroom.yaml",
        )?;
        raw.parse::<RepoName>().map_err(anyhow::Error::msg)
    }

    /// Resolve the repositories selected by `target`; failing is fatal
    pub async fn target_repositories(
        &self,
        platform: &dyn HostingPlatform,
        target: &TargetArgs,
    ) -> anyhow::Result<Vec<RepoHandle>> {
        let org = self.org(target.org.as_deref())?;
        let filter = self.repo_filter(target.repo_filter.as_deref())?;

        let spinner = Output::spinner(&format!("Listing repositories of {}...", org));
        let repos = find_repositories(platform, &org, &filter).await;
        spinner.finish_and_clear();

        let repos = repos?;
        Output::info(&format!(
            "{} repositories match '{}' in {}",
            repos.len(),
            filter,
            org
        ));
        Ok(repos)
    }
}
