//! Gather submissions from student repositories

use globset::{Glob, GlobMatcher};
use tracing::warn;

use super::moss::Submission;
use crate::core::tree::collect_files;
use crate::platform::{HostingPlatform, PlatformError, RemoteFile, RepoHandle};

/// Files that could not be fetched, as `repo: path (reason)`
pub type Skipped = Vec<String>;

fn is_pattern(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

fn matcher(pattern: &str) -> Result<GlobMatcher, PlatformError> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| PlatformError::ParseError(format!("invalid pattern '{}': {}", pattern, e)))
}

fn submission(repo: &RepoHandle, file: RemoteFile) -> Submission {
    let name = format!("{}_{}", repo.name, file.file_name());
    Submission::new(name, file.content)
}

/// Fetch every path of `paths` from `repo` as a base file
pub async fn base_files(
    platform: &dyn HostingPlatform,
    repo: &RepoHandle,
    paths: &[String],
) -> Result<Vec<Submission>, PlatformError> {
    let mut files = Vec::new();
    for path in paths.iter().filter(|p| !is_pattern(p)) {
        let file = platform.get_file(repo, path, None).await?;
        files.push(submission(repo, file));
    }
    Ok(files)
}

/// Fetch `paths` from each repository.
///
/// Glob patterns are matched against every file path of the repository.
/// A file that cannot be fetched is skipped and reported.
pub async fn student_files(
    platform: &dyn HostingPlatform,
    repos: &[RepoHandle],
    paths: &[String],
) -> Result<(Vec<Submission>, Skipped), PlatformError> {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        let pattern = if is_pattern(path) { Some(matcher(path)?) } else { None };

        for repo in repos {
            let targets = match &pattern {
                Some(glob) => match collect_files(platform, repo, "").await {
                    Ok(entries) => entries
                        .into_iter()
                        .filter(|e| glob.is_match(&e.path))
                        .map(|e| e.path)
                        .collect(),
                    Err(e) => {
                        warn!(repo = %repo.full_name, error = %e, "Failed to list repository");
                        skipped.push(format!("{}: {} ({})", repo.full_name, path, e));
                        continue;
                    }
                },
                None => vec![path.clone()],
            };

            for target in targets {
                match platform.get_file(repo, &target, None).await {
                    Ok(file) => files.push(submission(repo, file)),
                    Err(e) => {
                        warn!(repo = %repo.full_name, path = %target, error = %e, "Skipping file");
                        skipped.push(format!("{}: {} ({})", repo.full_name, target, e));
                    }
                }
            }
        }
    }

    Ok((files, skipped))
}
