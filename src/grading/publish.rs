//! Publish grades to a realtime database over REST

use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use super::grades::GradeRecord;
use super::GradingError;

/// `{repo: {test_name: {points, passing}}}`
pub fn grades_payload(repo: &str, grades: &[GradeRecord]) -> Value {
    let tests: Map<String, Value> = grades
        .iter()
        .map(|g| {
            (
                g.test_name.clone(),
                json!({ "points": g.points, "passing": g.passing }),
            )
        })
        .collect();
    let mut root = Map::new();
    root.insert(repo.to_string(), Value::Object(tests));
    Value::Object(root)
}

/// Database URL, with `access_token` appended when one is given
pub fn database_url(db_url: &str, access_token: Option<&str>) -> Result<Url, GradingError> {
    let mut url = Url::parse(db_url)
        .map_err(|e| GradingError::Publish(format!("invalid database URL '{}': {}", db_url, e)))?;
    if let Some(token) = access_token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("access_token", token);
    }
    Ok(url)
}

/// PATCH the repository's grades into the database; returns the response body
pub async fn publish_grades(
    http: &reqwest::Client,
    db_url: &str,
    access_token: Option<&str>,
    repo: &str,
    grades: &[GradeRecord],
) -> Result<String, GradingError> {
    let url = database_url(db_url, access_token)?;
    debug!(host = url.host_str().unwrap_or(""), repo, count = grades.len(), "Publishing grades");

    let response = http
        .patch(url)
        .json(&grades_payload(repo, grades))
        .send()
        .await
        .map_err(|e| GradingError::Publish(e.to_string()))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(GradingError::Publish(format!("{}: {}", status, body.trim())));
    }
    Ok(body)
}
