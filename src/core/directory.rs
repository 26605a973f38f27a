//! Repository directory lookup

use thiserror::Error;

use crate::platform::{HostingPlatform, PlatformError, RepoHandle};

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Organization '{org}' not found or not accessible")]
    OrganizationNotFound { org: String },

    #[error("No repository in '{org}' matches '{filter}'. Available repositories: {}", format_available(.available))]
    NoMatch {
        org: String,
        filter: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

/// Repositories of `org` whose name contains `filter`, in API order.
///
/// An empty filter matches every repository.
pub async fn find_repositories(
    platform: &dyn HostingPlatform,
    org: &str,
    filter: &str,
) -> Result<Vec<RepoHandle>, LookupError> {
    let repos = match platform.list_org_repositories(org).await {
        Ok(repos) => repos,
        Err(PlatformError::NotFound(_)) | Err(PlatformError::AuthError(_)) => {
            return Err(LookupError::OrganizationNotFound {
                org: org.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let available: Vec<String> = repos.iter().map(|r| r.name.clone()).collect();
    let matched: Vec<RepoHandle> = repos
        .into_iter()
        .filter(|r| r.name.contains(filter))
        .collect();

    if matched.is_empty() {
        return Err(LookupError::NoMatch {
            org: org.to_string(),
            filter: filter.to_string(),
            available,
        });
    }

    tracing::debug!(org, filter, count = matched.len(), "Matched repositories");
    Ok(matched)
}
