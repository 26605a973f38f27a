//! classroom CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use classroom_tools::cli::commands::{
    autogit::{self, AutogitArgs},
    branches::{self, DefaultBranchArgs, FreezeArgs, GradingPrArgs, ProtectBranchArgs},
    create_repo::{self, CreateRepoArgs, CreateTestReposArgs},
    delete_file::{self, DeleteFileArgs},
    grades::{self, GradesCommands},
    moss::{self, MossArgs},
    permissions::{self, PermissionsArgs},
    sync::{self, SyncArgs},
    trigger::{self, TriggerArgs},
    verify::{self, VerifyCommands},
    workflows::{self, DeleteRunsArgs, UpdateWorkflowsArgs},
};
use classroom_tools::cli::{CommandContext, GlobalArgs};
use classroom_tools::telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "classroom")]
#[command(author, version, about = "Administer course repositories on GitHub", long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy template files into student repositories
    Sync(SyncArgs),
    /// Create one student repository from a template
    CreateRepo(CreateRepoArgs),
    /// Create numbered test repositories from a template
    CreateTestRepos(CreateTestReposArgs),
    /// Set collaborator and team permissions
    Permissions(PermissionsArgs),
    /// Protect or unprotect a branch
    ProtectBranch(ProtectBranchArgs),
    /// Change the default branch
    DefaultBranch(DefaultBranchArgs),
    /// Freeze submissions in a protected branch at the default branch head
    Freeze(FreezeArgs),
    /// Create a grading branch at the first commit and open a pull request
    GradingPr(GradingPrArgs),
    /// Delete a file
    DeleteFile(DeleteFileArgs),
    /// Send a repository_dispatch event
    Trigger(TriggerArgs),
    /// Replace workflow files from the template
    UpdateWorkflows(UpdateWorkflowsArgs),
    /// Delete workflow run history
    DeleteRuns(DeleteRunsArgs),
    /// Pre-flight verifications
    Verify {
        #[command(subcommand)]
        action: VerifyCommands,
    },
    /// Grades from test logs
    Grades {
        #[command(subcommand)]
        action: GradesCommands,
    },
    /// Submit student files to MOSS and archive the report
    Moss(MossArgs),
    /// Commit, pull and push one file on a timer
    Autogit(AutogitArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = init_telemetry(&TelemetryConfig::from_flags(cli.globals.verbose))?;

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "classroom", &mut std::io::stdout());
        return Ok(());
    }

    let ctx = CommandContext::load(&cli.globals)?;

    match &cli.command {
        Commands::Sync(args) => sync::run_sync(&ctx, args).await?,
        Commands::CreateRepo(args) => create_repo::run_create_repo(&ctx, args).await?,
        Commands::CreateTestRepos(args) => create_repo::run_create_test_repos(&ctx, args).await?,
        Commands::Permissions(args) => permissions::run_permissions(&ctx, args).await?,
        Commands::ProtectBranch(args) => branches::run_protect_branch(&ctx, args).await?,
        Commands::DefaultBranch(args) => branches::run_default_branch(&ctx, args).await?,
        Commands::Freeze(args) => branches::run_freeze(&ctx, args).await?,
        Commands::GradingPr(args) => branches::run_grading_pr(&ctx, args).await?,
        Commands::DeleteFile(args) => delete_file::run_delete_file(&ctx, args).await?,
        Commands::Trigger(args) => trigger::run_trigger(&ctx, args).await?,
        Commands::UpdateWorkflows(args) => workflows::run_update_workflows(&ctx, args).await?,
        Commands::DeleteRuns(args) => workflows::run_delete_runs(&ctx, args).await?,
        Commands::Verify { action } => verify::run_verify(&ctx, action).await?,
        Commands::Grades { action } => grades::run_grades(&ctx, action).await?,
        Commands::Moss(args) => moss::run_moss(&ctx, args).await?,
        Commands::Autogit(args) => autogit::run_autogit(args).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
