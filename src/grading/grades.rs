//! Grade records and scores

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::test_log::TestResult;
use super::{read_file, write_file, GradingError};

/// Display name and weight of one test function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAssociation {
    pub name: String,
    #[serde(deserialize_with = "points_from_number_or_string")]
    pub points: u32,
}

/// Association files written by hand sometimes quote the points
fn points_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Points {
        Number(u32),
        Text(String),
    }

    match Points::deserialize(deserializer)? {
        Points::Number(n) => Ok(n),
        Points::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub func_name: String,
    pub passing: bool,
    pub test_name: String,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub earned: u32,
    pub total: u32,
}

impl Score {
    pub fn of(grades: &[GradeRecord]) -> Self {
        grades.iter().fold(Score::default(), |score, g| Score {
            earned: score.earned + if g.passing { g.points } else { 0 },
            total: score.total + g.points,
        })
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.earned, self.total)
    }
}

pub fn load_associations(path: &Path) -> Result<HashMap<String, TestAssociation>, GradingError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| GradingError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Enrich raw results; every result needs an association
pub fn build_grades(
    results: &[TestResult],
    associations: &HashMap<String, TestAssociation>,
) -> Result<Vec<GradeRecord>, GradingError> {
    results
        .iter()
        .map(|result| {
            let test = associations
                .get(&result.func_name)
                .ok_or_else(|| GradingError::MissingAssociation(result.func_name.clone()))?;
            Ok(GradeRecord {
                func_name: result.func_name.clone(),
                passing: result.passing,
                test_name: test.name.clone(),
                points: test.points,
            })
        })
        .collect()
}

/// Function names of results with no association
pub fn unassociated(
    results: &[TestResult],
    associations: &HashMap<String, TestAssociation>,
) -> Vec<String> {
    results
        .iter()
        .filter(|r| !associations.contains_key(&r.func_name))
        .map(|r| r.func_name.clone())
        .collect()
}

/// Read grades written by [`save_grades`]
pub fn load_grades(path: &Path) -> Result<Vec<GradeRecord>, GradingError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| GradingError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write grades as a JSON array, creating parent directories
pub fn save_grades(path: &Path, grades: &[GradeRecord]) -> Result<(), GradingError> {
    let json = serde_json::to_string_pretty(grades).map_err(|source| GradingError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &json)
}
