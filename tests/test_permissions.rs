//! Permission confirmation across several repositories.

mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use classroom_tools::cli::commands::permissions::confirm;
use classroom_tools::platform::PermissionLevel;
use common::mock_platform::*;

#[tokio::test]
async fn test_confirm_keeps_going_after_listing_failure() {
    let (server, adapter) = setup_github_mock().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/hw1-alice/collaborators"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/hw1-bob/collaborators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"login": "teacher", "permissions": {"admin": true, "push": true, "pull": true}},
            {"login": "bob", "permissions": {"admin": false, "push": false, "pull": true}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/hw1-bob/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Students", "slug": "students", "permission": "push"}
        ])))
        .mount(&server)
        .await;

    let repos = vec![repo_handle("org", "hw1-alice"), repo_handle("org", "hw1-bob")];
    let check = confirm(&adapter, &repos, PermissionLevel::Pull).await;

    assert_eq!(check.ok, 1);
    assert_eq!(check.failed.len(), 2, "{:?}", check.failed);
    assert!(check.failed[0].starts_with("org/hw1-alice: "));
    assert_eq!(check.failed[1], "org/hw1-bob: team Students: push");
}
