//! Grading pipeline: test log to grades file, README section and database.

use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use classroom_tools::grading::{
    build_grades, load_associations, load_grades, parse_test_log, publish_grades, save_grades,
    splice_readme, GradingError, Score,
};

const LOG: &str = "test_sum (tests.TestExercise) ... ok\n\
                   test_mean (tests.TestExercise) ... FAIL\n\
                   test_io (tests.TestExercise) ... ERROR\n\
                   \n\
                   ======================================================================\n\
                   FAIL: test_mean (tests.TestExercise)\n";

const ASSOCIATIONS: &str = r#"{
    "test_sum": {"name": "Somme", "points": 2},
    "test_mean": {"name": "Moyenne", "points": "3"},
    "test_io": {"name": "Lecture du fichier", "points": 1}
}"#;

fn write_inputs(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("logs")).unwrap();
    fs::write(dir.join("logs/tests_results.txt"), LOG).unwrap();
    fs::write(dir.join("test_associations.json"), ASSOCIATIONS).unwrap();
}

#[test]
fn test_log_to_grades_file_and_readme() {
    let temp = TempDir::new().unwrap();
    write_inputs(temp.path());

    let log = fs::read_to_string(temp.path().join("logs/tests_results.txt")).unwrap();
    let results = parse_test_log(&log);
    assert_eq!(results.len(), 3);

    let associations = load_associations(&temp.path().join("test_associations.json")).unwrap();
    let grades = build_grades(&results, &associations).unwrap();
    let grades_path = temp.path().join("logs/grades.json");
    save_grades(&grades_path, &grades).unwrap();

    let loaded = load_grades(&grades_path).unwrap();
    assert_eq!(loaded, grades);
    assert_eq!(Score::of(&loaded), Score { earned: 2, total: 6 });

    let readme = "# Devoir 1\n\nÉnoncé du devoir.\n";
    let once = splice_readme(readme, &loaded);
    assert!(once.starts_with("## Résultats"));
    assert!(once.contains("2/2 | Somme"));
    assert!(once.contains("0/3 | Moyenne"));
    assert!(once.contains("2/6 | **Total**"));
    assert!(once.contains("# Devoir 1"));

    // Re-running with new grades replaces the section instead of stacking
    let mut improved = loaded.clone();
    improved[1].passing = true;
    let twice = splice_readme(&once, &improved);
    assert_eq!(twice.matches("## Résultats").count(), 1);
    assert!(twice.contains("5/6 | **Total**"));
}

#[test]
fn test_unknown_test_function_is_an_error() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("assoc.json"),
        r#"{"test_sum": {"name": "Somme", "points": 2}}"#,
    )
    .unwrap();
    let associations = load_associations(&temp.path().join("assoc.json")).unwrap();
    let results = parse_test_log("test_other (tests.T) ... ok\n");

    let err = build_grades(&results, &associations).unwrap_err();
    assert!(matches!(err, GradingError::MissingAssociation(ref name) if name == "test_other"));
}

#[test]
fn test_invalid_associations_json() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("assoc.json"), "{not json").unwrap();
    let err = load_associations(&temp.path().join("assoc.json")).unwrap_err();
    assert!(matches!(err, GradingError::Json { .. }));
}

#[tokio::test]
async fn test_publish_patches_repo_grades() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/grades.json"))
        .and(query_param("access_token", "db-secret"))
        .and(body_json(json!({
            "hw1-alice": {
                "Somme": {"points": 2, "passing": true},
                "Moyenne": {"points": 3, "passing": false}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    write_inputs(temp.path());
    let associations = load_associations(&temp.path().join("test_associations.json")).unwrap();
    let results = parse_test_log("test_sum (t) ... ok\ntest_mean (t) ... FAIL\n");
    let grades = build_grades(&results, &associations).unwrap();

    let http = reqwest::Client::new();
    let body = publish_grades(
        &http,
        &format!("{}/grades.json", server.uri()),
        Some("db-secret"),
        "hw1-alice",
        &grades,
    )
    .await
    .unwrap();
    assert!(body.contains("ok"));
}

#[tokio::test]
async fn test_publish_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/grades.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let err = publish_grades(
        &http,
        &format!("{}/grades.json", server.uri()),
        None,
        "hw1-alice",
        &[],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GradingError::Publish(_)));
    assert!(err.to_string().contains("Permission denied"));
}
