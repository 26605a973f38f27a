//! Sync manifest resolution
//!
//! The manifest is the set of template paths mirrored into student
//! repositories. It is resolved once, before any file is copied.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::platform::{HostingPlatform, PlatformError, RepoHandle};

/// Manifest location inside the template repository
pub const DEFAULT_MANIFEST_PATH: &str = "settings/files_to_update.txt";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest {path} not found in {repo}")]
    NotFound { repo: String, path: String },

    #[error("Manifest {path} in {repo} is not valid UTF-8")]
    InvalidUtf8 { repo: String, path: String },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Deduplicated set of relative paths to keep in sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncManifest {
    paths: BTreeSet<String>,
}

/// Comparison of a manifest against a template's file list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestCheck {
    /// Listed and present in the template
    pub found: Vec<String>,
    /// Present in the template but not listed
    pub not_included: Vec<String>,
    /// Listed but absent from the template
    pub missing: Vec<String>,
}

impl ManifestCheck {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

impl SyncManifest {
    /// Paths kept exactly as given, deduplicated
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Parse a line-delimited manifest; surrounding whitespace is
    /// trimmed and blank lines are ignored
    pub fn parse(text: &str) -> Self {
        Self::from_paths(text.lines().map(str::trim))
    }

    /// Explicit paths win; otherwise read `manifest_path` from the template
    pub async fn resolve(
        platform: &dyn HostingPlatform,
        template: &RepoHandle,
        explicit: &[String],
        manifest_path: &str,
    ) -> Result<Self, ManifestError> {
        if !explicit.is_empty() {
            return Ok(Self::from_paths(explicit.iter().cloned()));
        }

        let file = match platform.get_file(template, manifest_path, None).await {
            Ok(file) => file,
            Err(PlatformError::NotFound(_)) => {
                return Err(ManifestError::NotFound {
                    repo: template.full_name.clone(),
                    path: manifest_path.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8(file.content).map_err(|_| ManifestError::InvalidUtf8 {
            repo: template.full_name.clone(),
            path: manifest_path.to_string(),
        })?;
        Ok(Self::parse(&text))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Compare against every file path of the template
    pub fn check<'a, I>(&self, template_paths: I) -> ManifestCheck
    where
        I: IntoIterator<Item = &'a str>,
    {
        let template: BTreeSet<&str> = template_paths.into_iter().collect();
        ManifestCheck {
            found: self
                .iter()
                .filter(|p| template.contains(p))
                .map(String::from)
                .collect(),
            not_included: template
                .iter()
                .filter(|p| !self.contains(p))
                .map(|p| p.to_string())
                .collect(),
            missing: self
                .iter()
                .filter(|p| !template.contains(p))
                .map(String::from)
                .collect(),
        }
    }
}
