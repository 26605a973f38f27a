//! wiremock-based mock helpers for GitHub API tests.
//!
//! Provides response builders for the REST endpoints the classroom commands
//! use, allowing fully offline testing of the adapter and of the sync
//! workflow.

use base64::Engine;
use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use classroom_tools::platform::github::GitHubAdapter;
use classroom_tools::platform::RepoHandle;

pub const MOCK_TOKEN: &str = "mock-test-token";

/// Start a wiremock server and a GitHubAdapter pointed at it.
pub async fn setup_github_mock() -> (MockServer, GitHubAdapter) {
    let server = MockServer::start().await;
    let adapter = GitHubAdapter::new(Some(&server.uri()), MOCK_TOKEN);
    (server, adapter)
}

/// Handle for `owner/name` on branch `main`, as returned by a lookup.
pub fn repo_handle(owner: &str, name: &str) -> RepoHandle {
    RepoHandle {
        owner: owner.to_string(),
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        default_branch: "main".to_string(),
        private: false,
        is_template: false,
    }
}

/// Generate a complete GitHub Author JSON object matching octocrab's Author struct.
fn github_user_json(login: &str, id: u64) -> Value {
    let api = format!("https://api.github.com/users/{}", login);
    let mut m = Map::new();
    m.insert("login".into(), json!(login));
    m.insert("id".into(), json!(id));
    m.insert("node_id".into(), json!(format!("MDQ6VXNlcjE{}", id)));
    m.insert(
        "avatar_url".into(),
        json!(format!("https://avatars.githubusercontent.com/u/{}?v=4", id)),
    );
    m.insert("gravatar_id".into(), json!(""));
    m.insert("url".into(), json!(&api));
    m.insert(
        "html_url".into(),
        json!(format!("https://github.com/{}", login)),
    );
    let url_fields = [
        ("followers_url", "/followers"),
        ("following_url", "/following{/other_user}"),
        ("gists_url", "/gists{/gist_id}"),
        ("starred_url", "/starred{/owner}{/repo}"),
        ("subscriptions_url", "/subscriptions"),
        ("organizations_url", "/orgs"),
        ("repos_url", "/repos"),
        ("events_url", "/events{/privacy}"),
        ("received_events_url", "/received_events"),
    ];
    for (field, suffix) in url_fields {
        m.insert(field.into(), json!(format!("{}{}", api, suffix)));
    }
    m.insert("type".into(), json!("User"));
    m.insert("site_admin".into(), json!(false));
    Value::Object(m)
}

/// Generate a complete GitHub repository JSON object.
///
/// Octocrab deserializes it inside PR payloads and the adapter reads it from
/// the organization listing. Built programmatically to avoid macro recursion
/// limits.
pub fn github_repo_json(owner: &str, repo: &str) -> Value {
    let base = format!("https://api.github.com/repos/{}/{}", owner, repo);
    let html = format!("https://github.com/{}/{}", owner, repo);

    let mut m = Map::new();
    m.insert("id".into(), json!(1));
    m.insert("node_id".into(), json!("MDEwOlJlcG9zaXRvcnkx"));
    m.insert("name".into(), json!(repo));
    m.insert("full_name".into(), json!(format!("{}/{}", owner, repo)));
    m.insert("private".into(), json!(false));
    m.insert("owner".into(), github_user_json(owner, 1));
    m.insert("html_url".into(), json!(html));
    m.insert("description".into(), Value::Null);
    m.insert("fork".into(), json!(false));
    m.insert("url".into(), json!(&base));

    let url_fields = [
        ("forks_url", "/forks"),
        ("keys_url", "/keys{/key_id}"),
        ("collaborators_url", "/collaborators{/collaborator}"),
        ("teams_url", "/teams"),
        ("hooks_url", "/hooks"),
        ("issue_events_url", "/issues/events{/number}"),
        ("events_url", "/events"),
        ("assignees_url", "/assignees{/user}"),
        ("branches_url", "/branches{/branch}"),
        ("tags_url", "/tags"),
        ("blobs_url", "/git/blobs{/sha}"),
        ("git_tags_url", "/git/tags{/sha}"),
        ("git_refs_url", "/git/refs{/sha}"),
        ("trees_url", "/git/trees{/sha}"),
        ("statuses_url", "/statuses/{sha}"),
        ("languages_url", "/languages"),
        ("stargazers_url", "/stargazers"),
        ("contributors_url", "/contributors"),
        ("subscribers_url", "/subscribers"),
        ("subscription_url", "/subscription"),
        ("commits_url", "/commits{/sha}"),
        ("git_commits_url", "/git/commits{/sha}"),
        ("comments_url", "/comments{/number}"),
        ("issue_comment_url", "/issues/comments{/number}"),
        ("contents_url", "/contents/{+path}"),
        ("compare_url", "/compare/{base}...{head}"),
        ("merges_url", "/merges"),
        ("archive_url", "/{archive_format}{/ref}"),
        ("downloads_url", "/downloads"),
        ("issues_url", "/issues{/number}"),
        ("pulls_url", "/pulls{/number}"),
        ("milestones_url", "/milestones{/number}"),
        ("notifications_url", "/notifications{?since,all,participating}"),
        ("labels_url", "/labels{/name}"),
        ("releases_url", "/releases{/id}"),
        ("deployments_url", "/deployments"),
    ];

    for (field, suffix) in url_fields {
        m.insert(field.into(), json!(format!("{}{}", base, suffix)));
    }

    m.insert("created_at".into(), json!("2024-01-01T00:00:00Z"));
    m.insert("updated_at".into(), json!("2024-01-01T00:00:00Z"));
    m.insert("pushed_at".into(), json!("2024-01-01T00:00:00Z"));
    m.insert(
        "git_url".into(),
        json!(format!("git://github.com/{}/{}.git", owner, repo)),
    );
    m.insert(
        "ssh_url".into(),
        json!(format!("git@github.com:{}/{}.git", owner, repo)),
    );
    m.insert(
        "clone_url".into(),
        json!(format!("https://github.com/{}/{}.git", owner, repo)),
    );
    m.insert("svn_url".into(), json!(html));
    m.insert("homepage".into(), Value::Null);
    m.insert("size".into(), json!(0));
    m.insert("stargazers_count".into(), json!(0));
    m.insert("watchers_count".into(), json!(0));
    m.insert("language".into(), json!("Python"));
    m.insert("has_issues".into(), json!(true));
    m.insert("has_projects".into(), json!(true));
    m.insert("has_downloads".into(), json!(true));
    m.insert("has_wiki".into(), json!(true));
    m.insert("has_pages".into(), json!(false));
    m.insert("forks_count".into(), json!(0));
    m.insert("mirror_url".into(), Value::Null);
    m.insert("archived".into(), json!(false));
    m.insert("disabled".into(), json!(false));
    m.insert("open_issues_count".into(), json!(0));
    m.insert("license".into(), Value::Null);
    m.insert("forks".into(), json!(0));
    m.insert("open_issues".into(), json!(0));
    m.insert("watchers".into(), json!(0));
    m.insert("default_branch".into(), json!("main"));
    m.insert("is_template".into(), json!(false));
    m.insert("allow_squash_merge".into(), json!(true));
    m.insert("allow_merge_commit".into(), json!(true));
    m.insert("allow_rebase_merge".into(), json!(true));

    Value::Object(m)
}

/// Generate an open GitHub PR JSON response that octocrab can deserialize.
fn github_pr_json(owner: &str, repo: &str, number: u64, head_branch: &str, base_branch: &str) -> Value {
    let repo_json = github_repo_json(owner, repo);
    let api_base = format!("https://api.github.com/repos/{}/{}", owner, repo);
    let html_base = format!("https://github.com/{}/{}", owner, repo);

    let mut m = Map::new();
    m.insert("id".into(), json!(number));
    m.insert("number".into(), json!(number));
    m.insert("node_id".into(), json!(format!("PR_{}", number)));
    m.insert("state".into(), json!("open"));
    m.insert("title".into(), json!("Grading"));
    m.insert(
        "html_url".into(),
        json!(format!("{}/pull/{}", html_base, number)),
    );
    m.insert(
        "diff_url".into(),
        json!(format!("{}/pull/{}.diff", html_base, number)),
    );
    m.insert(
        "patch_url".into(),
        json!(format!("{}/pull/{}.patch", html_base, number)),
    );
    m.insert(
        "issue_url".into(),
        json!(format!("{}/issues/{}", api_base, number)),
    );
    m.insert(
        "commits_url".into(),
        json!(format!("{}/pulls/{}/commits", api_base, number)),
    );
    m.insert(
        "review_comments_url".into(),
        json!(format!("{}/pulls/{}/comments", api_base, number)),
    );
    m.insert(
        "review_comment_url".into(),
        json!(format!("{}/pulls/comments{{/number}}", api_base)),
    );
    m.insert(
        "comments_url".into(),
        json!(format!("{}/issues/{}/comments", api_base, number)),
    );
    m.insert(
        "statuses_url".into(),
        json!(format!("{}/statuses/abc123def456", api_base)),
    );

    m.insert(
        "head".into(),
        json!({
            "ref": head_branch,
            "sha": "abc123def456",
            "label": format!("{}:{}", owner, head_branch),
            "repo": repo_json.clone(),
            "user": github_user_json(owner, 1)
        }),
    );
    m.insert(
        "base".into(),
        json!({
            "ref": base_branch,
            "sha": "def456abc123",
            "label": format!("{}:{}", owner, base_branch),
            "repo": repo_json,
            "user": github_user_json(owner, 1)
        }),
    );

    m.insert("body".into(), json!(""));
    m.insert("draft".into(), json!(false));
    m.insert("locked".into(), json!(false));
    m.insert("user".into(), github_user_json("teacher", 2));
    m.insert("merged".into(), json!(false));
    m.insert("merged_at".into(), Value::Null);
    m.insert("mergeable".into(), json!(true));
    m.insert("mergeable_state".into(), json!("clean"));
    m.insert("merge_commit_sha".into(), Value::Null);
    m.insert(
        "url".into(),
        json!(format!("{}/pulls/{}", api_base, number)),
    );
    m.insert("created_at".into(), json!("2024-01-01T00:00:00Z"));
    m.insert("updated_at".into(), json!("2024-01-01T00:00:00Z"));
    m.insert("closed_at".into(), Value::Null);
    m.insert("labels".into(), json!([]));
    m.insert("milestone".into(), Value::Null);
    m.insert("assignee".into(), Value::Null);
    m.insert("assignees".into(), json!([]));
    m.insert("requested_reviewers".into(), json!([]));
    m.insert("requested_teams".into(), json!([]));
    m.insert("active_lock_reason".into(), Value::Null);

    Value::Object(m)
}

/// `contents` item for a file, with its bytes inlined as base64
pub fn file_json(file_path: &str, content: &str, sha: &str) -> Value {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);
    json!({
        "type": "file",
        "path": file_path,
        "name": name,
        "sha": sha,
        "size": content.len(),
        "encoding": "base64",
        "content": base64::engine::general_purpose::STANDARD.encode(content),
    })
}

/// `contents` listing item; `kind` is `file` or `dir`
pub fn entry_json(entry_path: &str, kind: &str) -> Value {
    let name = entry_path.rsplit('/').next().unwrap_or(entry_path);
    json!({
        "type": kind,
        "path": entry_path,
        "name": name,
        "sha": format!("sha-{}", entry_path),
        "size": 0,
    })
}

fn contents_path(owner: &str, repo: &str, file_path: &str) -> String {
    format!("/repos/{}/{}/contents/{}", owner, repo, file_path)
}

/// GET /orgs/:org/repos returning one repository per name
pub async fn mock_org_repos(server: &MockServer, org: &str, names: &[&str]) {
    let items: Vec<Value> = names.iter().map(|n| github_repo_json(org, n)).collect();

    Mock::given(method("GET"))
        .and(path(format!("/orgs/{}/repos", org)))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// GET /repos/:owner/:repo returning the repository
pub async fn mock_get_repo(server: &MockServer, owner: &str, repo: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}", owner, repo)))
        .respond_with(ResponseTemplate::new(200).set_body_json(github_repo_json(owner, repo)))
        .mount(server)
        .await;
}

/// GET a directory listing; `dir` is `""` for the root
pub async fn mock_directory(
    server: &MockServer,
    owner: &str,
    repo: &str,
    dir: &str,
    entries: &[(&str, &str)],
) {
    let items: Vec<Value> = entries
        .iter()
        .map(|(entry_path, kind)| entry_json(entry_path, kind))
        .collect();

    Mock::given(method("GET"))
        .and(path(contents_path(owner, repo, dir)))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// GET a file's contents
pub async fn mock_file(
    server: &MockServer,
    owner: &str,
    repo: &str,
    file_path: &str,
    content: &str,
    sha: &str,
) {
    Mock::given(method("GET"))
        .and(path(contents_path(owner, repo, file_path)))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json(file_path, content, sha)))
        .mount(server)
        .await;
}

/// GET a file that does not exist
pub async fn mock_file_missing(server: &MockServer, owner: &str, repo: &str, file_path: &str) {
    Mock::given(method("GET"))
        .and(path(contents_path(owner, repo, file_path)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(server)
        .await;
}

/// PUT a file, expected exactly `times` times
pub async fn mock_put_file(
    server: &MockServer,
    owner: &str,
    repo: &str,
    file_path: &str,
    times: u64,
) {
    Mock::given(method("PUT"))
        .and(path(contents_path(owner, repo, file_path)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"content": {}, "commit": {}})))
        .expect(times)
        .mount(server)
        .await;
}

/// PUT /repos/:owner/:repo/contents/:path answering with a server error
pub async fn mock_put_file_failing(server: &MockServer, owner: &str, repo: &str, file_path: &str) {
    Mock::given(method("PUT"))
        .and(path(contents_path(owner, repo, file_path)))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Server Error"})))
        .mount(server)
        .await;
}

/// GitHub API response for creating a PR (POST /repos/:owner/:repo/pulls).
pub async fn mock_create_pr(server: &MockServer, owner: &str, repo: &str, number: u64, head: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/{}/pulls", owner, repo)))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(github_pr_json(owner, repo, number, head, "main")),
        )
        .mount(server)
        .await;
}

/// GitHub API response for listing open PRs (GET /repos/:owner/:repo/pulls).
pub async fn mock_list_prs(server: &MockServer, owner: &str, repo: &str, prs: Vec<(u64, &str)>) {
    let items: Vec<Value> = prs
        .iter()
        .map(|(number, head)| github_pr_json(owner, repo, *number, head, "main"))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/pulls", owner, repo)))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}
