//! Template synchronization against a mocked GitHub API.
//!
//! Covers repository lookup, manifest resolution, lazy tree walking and the
//! create/update/unchanged decisions of the copier.

mod common;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use classroom_tools::core::copier::{fetch_manifest_files, sync_repository};
use classroom_tools::core::tree::walk_files;
use classroom_tools::core::{
    deliver, find_repositories, CopyOptions, CopyOutcome, DeliveryReport, DeliveryTarget,
    LookupError, ManifestError, SyncManifest,
};
use common::mock_platform::*;

/// Template with `a.txt`, `README.md` and `b/c.txt`
async fn mount_template(server: &MockServer) {
    mock_directory(
        server,
        "org",
        "template",
        "",
        &[("a.txt", "file"), ("README.md", "file"), ("b", "dir")],
    )
    .await;
    mock_directory(server, "org", "template", "b", &[("b/c.txt", "file")]).await;
    mock_file(server, "org", "template", "a.txt", "alpha\n", "sha-a").await;
    mock_file(server, "org", "template", "b/c.txt", "gamma\n", "sha-c").await;
    mock_file(server, "org", "template", "README.md", "# Template\n", "sha-readme").await;
}

fn manifest() -> SyncManifest {
    SyncManifest::from_paths(vec!["a.txt", "b/c.txt"])
}

// ── Lookup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lookup_filters_by_substring() {
    let (server, adapter) = setup_github_mock().await;
    mock_org_repos(&server, "org", &["hw1-alice", "hw1-bob", "other"]).await;

    let repos = find_repositories(&adapter, "org", "hw1-").await.unwrap();
    let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["hw1-alice", "hw1-bob"]);
}

#[tokio::test]
async fn test_lookup_no_match_lists_available() {
    let (server, adapter) = setup_github_mock().await;
    mock_org_repos(&server, "org", &["hw1-alice", "other"]).await;

    let err = find_repositories(&adapter, "org", "hw9-").await.unwrap_err();
    assert!(matches!(err, LookupError::NoMatch { .. }));
    let msg = err.to_string();
    assert!(msg.contains("hw1-alice"), "{}", msg);
    assert!(msg.contains("other"), "{}", msg);
}

#[tokio::test]
async fn test_lookup_unknown_org() {
    let (server, adapter) = setup_github_mock().await;
    Mock::given(method("GET"))
        .and(path("/orgs/ghost/repos"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let err = find_repositories(&adapter, "ghost", "").await.unwrap_err();
    assert!(matches!(err, LookupError::OrganizationNotFound { .. }));
}

// ── Manifest ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_manifest_read_from_template() {
    let (server, adapter) = setup_github_mock().await;
    mock_file(
        &server,
        "org",
        "template",
        "settings/files_to_update.txt",
        "a.txt\n\nb/c.txt\n",
        "sha-manifest",
    )
    .await;

    let template = repo_handle("org", "template");
    let manifest = SyncManifest::resolve(&adapter, &template, &[], "settings/files_to_update.txt")
        .await
        .unwrap();
    assert_eq!(manifest.iter().collect::<Vec<_>>(), vec!["a.txt", "b/c.txt"]);
}

#[tokio::test]
async fn test_manifest_explicit_paths_skip_lookup() {
    // No mock mounted: any request would fail
    let (_server, adapter) = setup_github_mock().await;
    let template = repo_handle("org", "template");
    let manifest = SyncManifest::resolve(
        &adapter,
        &template,
        &["x.py".to_string()],
        "settings/files_to_update.txt",
    )
    .await
    .unwrap();
    assert!(manifest.contains("x.py"));
}

#[tokio::test]
async fn test_manifest_missing_names_location() {
    let (server, adapter) = setup_github_mock().await;
    mock_file_missing(&server, "org", "template", "settings/files_to_update.txt").await;

    let template = repo_handle("org", "template");
    let err = SyncManifest::resolve(&adapter, &template, &[], "settings/files_to_update.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::NotFound { .. }));
}

// ── Tree walk ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_walk_is_depth_first_preorder() {
    let (server, adapter) = setup_github_mock().await;
    mock_template_listing(&server).await;

    let template = repo_handle("org", "template");
    let paths: Vec<String> = walk_files(&adapter, &template, "")
        .map(|entry| entry.unwrap().path)
        .collect()
        .await;
    assert_eq!(paths, vec!["a.txt", "b/c.txt", "b/d/e.txt", "z.txt"]);
}

async fn mock_template_listing(server: &MockServer) {
    mock_directory(
        server,
        "org",
        "template",
        "",
        &[("a.txt", "file"), ("b", "dir"), ("z.txt", "file")],
    )
    .await;
    mock_directory(server, "org", "template", "b", &[("b/c.txt", "file"), ("b/d", "dir")]).await;
    mock_directory(server, "org", "template", "b/d", &[("b/d/e.txt", "file")]).await;
}

#[tokio::test]
async fn test_walk_stops_after_listing_failure() {
    let (server, adapter) = setup_github_mock().await;
    mock_directory(&server, "org", "template", "", &[("b", "dir"), ("z.txt", "file")]).await;
    Mock::given(method("GET"))
        .and(path("/repos/org/template/contents/b"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let template = repo_handle("org", "template");
    let items: Vec<_> = walk_files(&adapter, &template, "").collect().await;
    assert_eq!(items.len(), 1);
    assert!(items[0].is_err());
}

// ── Copy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_manifest_files_reports_missing() {
    let (server, adapter) = setup_github_mock().await;
    mount_template(&server).await;

    let template = repo_handle("org", "template");
    let selected = SyncManifest::from_paths(vec!["a.txt", "b/c.txt", "gone.txt"]);
    let fetched = fetch_manifest_files(&adapter, &template, &selected)
        .await
        .unwrap();

    let paths: Vec<_> = fetched.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.txt", "b/c.txt"]);
    assert_eq!(fetched.missing, vec!["gone.txt"]);
    assert_eq!(fetched.files[0].content, b"alpha\n");
}

#[tokio::test]
async fn test_sync_creates_missing_and_skips_identical() {
    let (server, adapter) = setup_github_mock().await;
    mount_template(&server).await;
    mock_org_repos(&server, "org", &["hw1-alice", "hw1-bob", "other"]).await;

    for student in ["hw1-alice", "hw1-bob"] {
        mock_file(&server, "org", student, "a.txt", "alpha\n", "sha-a").await;
        mock_file_missing(&server, "org", student, "b/c.txt").await;
        mock_put_file(&server, "org", student, "b/c.txt", 1).await;
        mock_put_file(&server, "org", student, "a.txt", 0).await;
        mock_put_file(&server, "org", student, "README.md", 0).await;
    }
    mock_put_file(&server, "org", "other", "b/c.txt", 0).await;

    let template = repo_handle("org", "template");
    let files = fetch_manifest_files(&adapter, &template, &manifest())
        .await
        .unwrap()
        .files;

    let mut seen = Vec::new();
    let report = deliver(
        &adapter,
        &files,
        &DeliveryTarget::Api {
            org: "org".to_string(),
            filter: "hw1-".to_string(),
        },
        &CopyOptions::default(),
        &mut |outcome| seen.push(outcome.repo.clone()),
    )
    .await
    .unwrap();

    let DeliveryReport::Api(batch) = report else {
        panic!("expected an API delivery report");
    };
    assert_eq!(seen, vec!["org/hw1-alice", "org/hw1-bob"]);
    assert_eq!(batch.count(CopyOutcome::Created), 2);
    assert_eq!(batch.count(CopyOutcome::Unchanged), 2);
    assert!(!batch.has_failures());
}

#[tokio::test]
async fn test_second_sync_writes_nothing() {
    let (server, adapter) = setup_github_mock().await;
    mount_template(&server).await;
    mock_file(&server, "org", "hw1-alice", "a.txt", "alpha\n", "sha-a").await;
    mock_file(&server, "org", "hw1-alice", "b/c.txt", "gamma\n", "sha-c").await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let template = repo_handle("org", "template");
    let files = fetch_manifest_files(&adapter, &template, &manifest())
        .await
        .unwrap()
        .files;
    let target = repo_handle("org", "hw1-alice");

    let outcome = sync_repository(&adapter, &target, &files, &CopyOptions::default()).await;
    assert_eq!(outcome.count(CopyOutcome::Unchanged), 2);
    assert_eq!(outcome.failures(), 0);
}

#[tokio::test]
async fn test_changed_file_is_updated_with_previous_sha() {
    let (server, adapter) = setup_github_mock().await;
    mount_template(&server).await;
    mock_file(&server, "org", "hw1-alice", "a.txt", "student edit\n", "sha-old").await;
    mock_file(&server, "org", "hw1-alice", "b/c.txt", "gamma\n", "sha-c").await;
    Mock::given(method("PUT"))
        .and(path("/repos/org/hw1-alice/contents/a.txt"))
        .and(body_partial_json(json!({
            "sha": "sha-old",
            "branch": "main",
            "message": "Auto sync with template repo",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let template = repo_handle("org", "template");
    let files = fetch_manifest_files(&adapter, &template, &manifest())
        .await
        .unwrap()
        .files;
    let target = repo_handle("org", "hw1-alice");

    let outcome = sync_repository(&adapter, &target, &files, &CopyOptions::default()).await;
    assert_eq!(outcome.count(CopyOutcome::Updated), 1);
    assert_eq!(outcome.count(CopyOutcome::Unchanged), 1);
}

#[tokio::test]
async fn test_failed_write_does_not_stop_the_batch() {
    let (server, adapter) = setup_github_mock().await;
    mount_template(&server).await;
    mock_file_missing(&server, "org", "hw1-alice", "a.txt").await;
    mock_file_missing(&server, "org", "hw1-alice", "b/c.txt").await;
    Mock::given(method("PUT"))
        .and(path("/repos/org/hw1-alice/contents/a.txt"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Server Error"})))
        .expect(1)
        .mount(&server)
        .await;
    mock_put_file(&server, "org", "hw1-alice", "b/c.txt", 1).await;

    let template = repo_handle("org", "template");
    let files = fetch_manifest_files(&adapter, &template, &manifest())
        .await
        .unwrap()
        .files;
    let target = repo_handle("org", "hw1-alice");

    let outcome = sync_repository(&adapter, &target, &files, &CopyOptions::default()).await;
    assert_eq!(outcome.failures(), 1);
    assert_eq!(outcome.count(CopyOutcome::Created), 1);
    let failed = outcome.files.iter().find(|f| f.result.is_err()).unwrap();
    assert_eq!(failed.path, "a.txt");
}

#[tokio::test]
async fn test_sync_to_explicit_branch() {
    let (server, adapter) = setup_github_mock().await;
    mount_template(&server).await;
    mock_file_missing(&server, "org", "hw1-alice", "a.txt").await;
    Mock::given(method("PUT"))
        .and(path("/repos/org/hw1-alice/contents/a.txt"))
        .and(body_partial_json(json!({"branch": "staging"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"content": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let template = repo_handle("org", "template");
    let files = fetch_manifest_files(&adapter, &template, &SyncManifest::from_paths(vec!["a.txt"]))
        .await
        .unwrap()
        .files;
    let target = repo_handle("org", "hw1-alice");
    let options = CopyOptions {
        branch: Some("staging"),
        ..Default::default()
    };

    let outcome = sync_repository(&adapter, &target, &files, &options).await;
    assert_eq!(outcome.count(CopyOutcome::Created), 1);
}
