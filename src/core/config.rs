//! Course defaults file (`.classroom.yaml`)
//!
//! Holds values repeated on every invocation for one course: organization,
//! repository filter, template. Flags given on the command line win.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::platform::RepoName;

pub const CONFIG_FILE_NAME: &str = ".classroom.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassroomConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub repo_filter: Option<String>,
    /// `Org/Name` of the template repository
    #[serde(default)]
    pub template_repo: Option<String>,
    #[serde(default)]
    pub manifest_path: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl ClassroomConfig {
    /// Load a config from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a config from a YAML string; an empty document is allowed
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ClassroomConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(template) = &self.template_repo {
            template
                .parse::<RepoName>()
                .map_err(|e| ConfigError::ValidationError(format!("template_repo: {}", e)))?;
        }
        if let Some(url) = &self.api_url {
            url::Url::parse(url)
                .map_err(|e| ConfigError::ValidationError(format!("api_url '{}': {}", url, e)))?;
        }
        Ok(())
    }

    /// Load `explicit` if given, else the nearest `.classroom.yaml` from
    /// `start` upwards, else defaults
    pub fn discover(explicit: Option<&Path>, start: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match find_config_file(start) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using config file");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Nearest config file in `start` or one of its ancestors
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// First value present, command line before file
pub fn pick<T: Clone>(flag: Option<T>, file: &Option<T>) -> Option<T> {
    flag.or_else(|| file.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
org: INF1007-Exercices
repo_filter: TP1-
template_repo: INF1007-Exercices/TemplateExercise1
manifest_path: settings/files_to_update.txt
branch: master
"#;
        let config = ClassroomConfig::parse(yaml).unwrap();
        assert_eq!(config.org.as_deref(), Some("INF1007-Exercices"));
        assert_eq!(config.branch.as_deref(), Some("master"));
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_template() {
        let err = ClassroomConfig::parse("template_repo: not-a-repo\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!(matches!(
            ClassroomConfig::parse("organisation: typo\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ClassroomConfig::parse("\n").unwrap(), ClassroomConfig::default());
    }

    #[test]
    fn test_discover_searches_ancestors() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "org: course\n").unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = ClassroomConfig::discover(None, &nested).unwrap();
        assert_eq!(config.org.as_deref(), Some("course"));
    }

    #[test]
    fn test_pick_prefers_flag() {
        let file = Some("from-file".to_string());
        assert_eq!(pick(Some("flag".to_string()), &file).as_deref(), Some("flag"));
        assert_eq!(pick(None, &file).as_deref(), Some("from-file"));
    }
}
