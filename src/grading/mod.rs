//! Grades from unit-test logs
//!
//! A test log plus a map of test associations produces grade records,
//! which are rendered into the README and published to a realtime
//! database.

pub mod grades;
pub mod publish;
pub mod readme;
pub mod test_log;

pub use grades::{
    build_grades, load_associations, load_grades, save_grades, unassociated, GradeRecord, Score,
    TestAssociation,
};
pub use publish::publish_grades;
pub use readme::{results_section, splice_readme};
pub use test_log::{parse_test_log, TestResult};

use std::path::PathBuf;
use thiserror::Error;

/// Test log written by the grading workflow
pub const DEFAULT_TEST_LOG: &str = "logs/tests_results.txt";
/// Grades written by `grades create`
pub const DEFAULT_GRADES_FILE: &str = "logs/grades.json";

#[derive(Error, Debug)]
pub enum GradingError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No test association for '{0}'")]
    MissingAssociation(String),

    #[error("Failed to publish grades: {0}")]
    Publish(String),
}

pub(crate) fn read_file(path: &std::path::Path) -> Result<String, GradingError> {
    std::fs::read_to_string(path).map_err(|source| GradingError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_file(path: &std::path::Path, content: &str) -> Result<(), GradingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| GradingError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| GradingError::Io {
        path: path.to_path_buf(),
        source,
    })
}
