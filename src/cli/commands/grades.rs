//! Grades command implementation
//!
//! Runs inside a student repository after the test suite: turns the test
//! log into `logs/grades.json`, shows it in the README and publishes it.

use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::cli::context::CommandContext;
use crate::cli::output::Output;
use crate::grading::{
    build_grades, load_associations, load_grades, parse_test_log, publish_grades, save_grades,
    splice_readme, GradingError, Score, DEFAULT_GRADES_FILE, DEFAULT_TEST_LOG,
};

#[derive(Subcommand, Debug, Clone)]
pub enum GradesCommands {
    /// Build the grades file from the test log
    Create {
        #[arg(long, default_value = DEFAULT_TEST_LOG)]
        test_log: PathBuf,

        /// JSON object mapping test functions to {name, points}
        #[arg(long)]
        test_associations_path: PathBuf,

        #[arg(long, default_value = DEFAULT_GRADES_FILE)]
        output: PathBuf,
    },
    /// Write the results table into the README
    Readme {
        #[arg(long, default_value = DEFAULT_GRADES_FILE)]
        grades: PathBuf,

        #[arg(long, default_value = "README.md")]
        readme: PathBuf,
    },
    /// PATCH the grades into a realtime database
    Publish {
        /// Database URL, e.g. https://<project>.firebaseio.com/grades.json
        #[arg(long, alias = "firebase-real-time-db-url")]
        db_url: String,

        /// Database access token
        #[arg(long, env = "DB_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// Key the grades are stored under, usually the repository name
        #[arg(long)]
        github_repo: String,

        #[arg(long, default_value = DEFAULT_GRADES_FILE)]
        grades: PathBuf,
    },
}

/// Run a grades subcommand
pub async fn run_grades(_ctx: &CommandContext, action: &GradesCommands) -> anyhow::Result<()> {
    match action {
        GradesCommands::Create {
            test_log,
            test_associations_path,
            output,
        } => create(test_log, test_associations_path, output),
        GradesCommands::Readme { grades, readme } => update_readme(grades, readme),
        GradesCommands::Publish {
            db_url,
            access_token,
            github_repo,
            grades,
        } => publish(db_url, access_token.as_deref(), github_repo, grades).await,
    }
}

fn create(test_log: &Path, associations_path: &Path, output: &Path) -> anyhow::Result<()> {
    Output::banner("Creating grades");
    Output::args(&[
        ("test log", test_log.display().to_string()),
        ("test associations", associations_path.display().to_string()),
        ("output", output.display().to_string()),
    ]);

    let log = std::fs::read_to_string(test_log).map_err(|source| GradingError::Io {
        path: test_log.to_path_buf(),
        source,
    })?;
    let results = parse_test_log(&log);
    let associations = load_associations(associations_path)?;
    let grades = build_grades(&results, &associations)?;
    save_grades(output, &grades)?;

    for grade in &grades {
        let mark = if grade.passing { "success" } else { "failure" };
        println!("  {}\t{}", Output::status(mark), grade.test_name);
    }
    Output::success(&format!(
        "Wrote {} ({})",
        output.display(),
        Score::of(&grades)
    ));
    Ok(())
}

fn update_readme(grades_path: &Path, readme_path: &Path) -> anyhow::Result<()> {
    Output::banner("Showing grades in README");
    let grades = load_grades(grades_path)?;

    let readme = match std::fs::read_to_string(readme_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(GradingError::Io {
                path: readme_path.to_path_buf(),
                source,
            }
            .into())
        }
    };
    std::fs::write(readme_path, splice_readme(&readme, &grades)).map_err(|source| {
        GradingError::Io {
            path: readme_path.to_path_buf(),
            source,
        }
    })?;

    Output::success(&format!(
        "Updated {} with {}",
        readme_path.display(),
        Score::of(&grades)
    ));
    Ok(())
}

async fn publish(
    db_url: &str,
    access_token: Option<&str>,
    repo: &str,
    grades_path: &Path,
) -> anyhow::Result<()> {
    Output::banner("Publishing grades");
    Output::args(&[
        ("database", db_url.to_string()),
        ("repo", repo.to_string()),
        ("grades", grades_path.display().to_string()),
    ]);

    let grades = load_grades(grades_path)?;
    let http = reqwest::Client::new();
    let body = publish_grades(&http, db_url, access_token, repo, &grades).await?;
    Output::success("Grades published");
    if !body.trim().is_empty() {
        Output::kv("response", body.trim());
    }
    Ok(())
}
