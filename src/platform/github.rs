//! GitHub platform adapter

use async_trait::async_trait;
use base64::Engine;
use octocrab::Octocrab;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::rate_limit::{
    check_rate_limit_warning, parse_github_rate_limits, parse_oauth_scopes, RateLimitInfo,
};
use super::traits::{HostingPlatform, PlatformError};
use super::types::*;
use super::DEFAULT_API_URL;

#[cfg(feature = "telemetry")]
use std::time::Instant;

const USER_AGENT: &str = "classroom-tools";
const PER_PAGE: usize = 100;

/// GitHub API adapter
pub struct GitHubAdapter {
    base_url: String,
    token: String,
    http: reqwest::Client,
    quota_warned: AtomicBool,
}

/// Item of a `contents` response
#[derive(Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    name: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct RepoItem {
    name: String,
    full_name: String,
    owner: OwnerItem,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    is_template: bool,
}

#[derive(Deserialize)]
struct OwnerItem {
    login: String,
}

impl From<RepoItem> for RepoHandle {
    fn from(item: RepoItem) -> Self {
        RepoHandle {
            owner: item.owner.login,
            name: item.name,
            full_name: item.full_name,
            default_branch: item.default_branch.unwrap_or_else(|| "main".to_string()),
            private: item.private,
            is_template: item.is_template,
        }
    }
}

fn entry_kind(kind: &str) -> EntryKind {
    match kind {
        "dir" => EntryKind::Dir,
        "symlink" => EntryKind::Symlink,
        "submodule" => EntryKind::Submodule,
        _ => EntryKind::File,
    }
}

/// Percent-encode each segment of a repository path, keeping the separators
pub(crate) fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_base64(content: &str) -> Result<Vec<u8>, PlatformError> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| PlatformError::ParseError(format!("Invalid base64 content: {}", e)))
}

/// Map a non-success response to a platform error.
///
/// A 403 only counts as an authorization problem when the quota is not
/// exhausted; otherwise the call was rate limited.
pub(crate) fn map_status(
    status: StatusCode,
    rate: &RateLimitInfo,
    message: &str,
    context: &str,
) -> PlatformError {
    let detail = if message.is_empty() {
        format!("{} ({})", context, status)
    } else {
        format!("{}: {}", context, message)
    };

    match status.as_u16() {
        401 => PlatformError::AuthError(format!(
            "{}. The token was rejected; check GITHUB_TOKEN",
            detail
        )),
        403 if rate.is_rate_limited() => {
            PlatformError::ApiError(format!("{} (rate limit exceeded)", detail))
        }
        403 => PlatformError::AuthError(format!(
            "{}. The token lacks the required scope or access",
            detail
        )),
        404 => PlatformError::NotFound(detail),
        409 | 422 => PlatformError::Conflict(detail),
        _ => PlatformError::ApiError(detail),
    }
}

impl GitHubAdapter {
    /// Create a new GitHub adapter
    pub fn new(base_url: Option<&str>, token: &str) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
            quota_warned: AtomicBool::new(false),
        }
    }

    fn repo_url(&self, repo: &RepoHandle, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.base_url, repo.owner, repo.name, suffix
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
    }

    /// Send a request and map any non-success status
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, PlatformError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let result = request.send().await;

        #[cfg(feature = "telemetry")]
        {
            let duration = start.elapsed();
            debug!(
                context,
                status = result.as_ref().map(|r| r.status().as_u16()).unwrap_or(0),
                duration_ms = duration.as_millis() as u64,
                "GitHub request complete"
            );
        }
        #[cfg(not(feature = "telemetry"))]
        debug!(context, "GitHub request complete");

        let response = result.map_err(|e| PlatformError::NetworkError(e.to_string()))?;
        let rate = parse_github_rate_limits(response.headers());
        if (rate.is_rate_limited() || rate.is_approaching_limit())
            && !self.quota_warned.swap(true, Ordering::Relaxed)
        {
            check_rate_limit_warning(&rate);
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);
        Err(map_status(status, &rate, message.trim(), context))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T, PlatformError> {
        let response = self.send(self.request(Method::GET, url), context).await?;
        response
            .json()
            .await
            .map_err(|e| PlatformError::ParseError(e.to_string()))
    }

    async fn send_json(
        &self,
        method: Method,
        url: &str,
        body: &Value,
        context: &str,
    ) -> Result<Response, PlatformError> {
        self.send(self.request(method, url).json(body), context)
            .await
    }

    /// Collect every page of a list endpoint.
    ///
    /// `key` names the array inside wrapped responses such as
    /// `{"total_count": n, "workflow_runs": [...]}`.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: &str,
        key: Option<&str>,
        context: &str,
    ) -> Result<Vec<T>, PlatformError> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let page_url = format!("{}{}per_page={}&page={}", url, separator, PER_PAGE, page);
            let mut value: Value = self.get_json(&page_url, context).await?;
            let batch = match key {
                Some(key) => value.get_mut(key).map(Value::take).unwrap_or(Value::Null),
                None => value,
            };
            let batch: Vec<T> = match batch {
                Value::Null => Vec::new(),
                other => serde_json::from_value(other)
                    .map_err(|e| PlatformError::ParseError(e.to_string()))?,
            };
            let count = batch.len();
            items.extend(batch);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Octocrab client for the pull request endpoints
    fn octocrab(&self) -> Result<Octocrab, PlatformError> {
        Octocrab::builder()
            .personal_token(self.token.clone())
            .base_uri(self.base_url.as_str())
            .map_err(|e| PlatformError::ApiError(format!("Invalid base URL: {}", e)))?
            .build()
            .map_err(|e| PlatformError::ApiError(format!("Failed to create client: {}", e)))
    }
}

fn map_octocrab_error(e: octocrab::Error, context: &str) -> PlatformError {
    match e {
        octocrab::Error::GitHub { source, .. } => {
            let mut message = source.message.clone();
            if let Some(errors) = &source.errors {
                for err in errors {
                    if let Some(m) = err.get("message").and_then(|m| m.as_str()) {
                        message.push_str(": ");
                        message.push_str(m);
                    }
                }
            }
            if message.contains("already exists") {
                PlatformError::Conflict(format!("{}: {}", context, message))
            } else if message.contains("Bad credentials") {
                PlatformError::AuthError(format!("{}: {}", context, message))
            } else if message.contains("Not Found") {
                PlatformError::NotFound(format!("{}: {}", context, message))
            } else {
                PlatformError::ApiError(format!("{}: {}", context, message))
            }
        }
        other => PlatformError::NetworkError(format!("{}: {}", context, other)),
    }
}

#[async_trait]
impl HostingPlatform for GitHubAdapter {
    async fn verify_token(&self) -> Result<TokenStatus, PlatformError> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        let url = format!("{}/user", self.base_url);
        let response = self
            .send(self.request(Method::GET, &url), "Failed to verify token")
            .await?;
        let scopes = parse_oauth_scopes(response.headers());
        let rate_limit = parse_github_rate_limits(response.headers());
        let user: User = response
            .json()
            .await
            .map_err(|e| PlatformError::ParseError(e.to_string()))?;

        Ok(TokenStatus {
            login: user.login,
            scopes,
            rate_limit,
        })
    }

    async fn get_repository(&self, repo: &RepoName) -> Result<RepoHandle, PlatformError> {
        let url = format!("{}/repos/{}/{}", self.base_url, repo.owner, repo.name);
        let item: RepoItem = self
            .get_json(&url, &format!("Repository {} not available", repo))
            .await?;
        Ok(item.into())
    }

    async fn list_org_repositories(&self, org: &str) -> Result<Vec<RepoHandle>, PlatformError> {
        let url = format!("{}/orgs/{}/repos?type=all", self.base_url, org);
        let items: Vec<RepoItem> = self
            .get_paginated(&url, None, &format!("Failed to list repositories of {}", org))
            .await?;
        Ok(items.into_iter().map(RepoHandle::from).collect())
    }

    async fn list_directory(
        &self,
        repo: &RepoHandle,
        path: &str,
    ) -> Result<Vec<ContentEntry>, PlatformError> {
        let url = self.repo_url(
            repo,
            &format!(
                "/contents/{}?ref={}",
                encode_path(path),
                urlencoding::encode(&repo.default_branch)
            ),
        );
        let value: Value = self
            .get_json(&url, &format!("Failed to list {}:{}", repo.full_name, path))
            .await?;

        if !value.is_array() {
            return Err(PlatformError::ApiError(format!(
                "{}:{} is not a directory",
                repo.full_name, path
            )));
        }
        let items: Vec<ContentItem> =
            serde_json::from_value(value).map_err(|e| PlatformError::ParseError(e.to_string()))?;

        Ok(items
            .into_iter()
            .map(|item| ContentEntry {
                kind: entry_kind(&item.kind),
                path: item.path,
                name: item.name,
                sha: item.sha,
            })
            .collect())
    }

    async fn get_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        branch: Option<&str>,
    ) -> Result<RemoteFile, PlatformError> {
        let branch = branch.unwrap_or(&repo.default_branch);
        let url = self.repo_url(
            repo,
            &format!(
                "/contents/{}?ref={}",
                encode_path(path),
                urlencoding::encode(branch)
            ),
        );
        let context = format!("File {} not available in {}", path, repo.full_name);
        let value: Value = self.get_json(&url, &context).await?;
        if value.is_array() {
            return Err(PlatformError::ApiError(format!(
                "{}:{} is a directory",
                repo.full_name, path
            )));
        }
        let item: ContentItem =
            serde_json::from_value(value).map_err(|e| PlatformError::ParseError(e.to_string()))?;

        let inline = item.content.as_deref().unwrap_or("");
        let content = if inline.is_empty() && item.size > 0 {
            // Files over 1 MB come back without inline content
            #[derive(Deserialize)]
            struct Blob {
                content: String,
            }
            let blob_url = self.repo_url(repo, &format!("/git/blobs/{}", item.sha));
            let blob: Blob = self.get_json(&blob_url, &context).await?;
            decode_base64(&blob.content)?
        } else {
            decode_base64(inline)?
        };

        Ok(RemoteFile {
            path: item.path,
            content,
            sha: item.sha,
        })
    }

    async fn put_file(&self, repo: &RepoHandle, write: FileWrite<'_>) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, &format!("/contents/{}", encode_path(write.path)));
        let mut body = json!({
            "message": write.message,
            "content": base64::engine::general_purpose::STANDARD.encode(write.content),
            "branch": write.branch,
        });
        if let Some(sha) = write.sha {
            body["sha"] = json!(sha);
        }
        self.send_json(
            Method::PUT,
            &url,
            &body,
            &format!("Failed to write {} in {}", write.path, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn delete_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, &format!("/contents/{}", encode_path(path)));
        let body = json!({ "message": message, "sha": sha, "branch": branch });
        self.send_json(
            Method::DELETE,
            &url,
            &body,
            &format!("Failed to delete {} in {}", path, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn generate_from_template(
        &self,
        template: &RepoName,
        owner: &str,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/repos/{}/{}/generate",
            self.base_url, template.owner, template.name
        );
        let body = json!({
            "owner": owner,
            "name": name,
            "description": description,
            "private": private,
            "include_all_branches": false,
        });
        self.send_json(
            Method::POST,
            &url,
            &body,
            &format!("Failed to generate {}/{} from {}", owner, name, template),
        )
        .await?;
        Ok(())
    }

    async fn list_collaborators(
        &self,
        repo: &RepoHandle,
    ) -> Result<Vec<Collaborator>, PlatformError> {
        let url = self.repo_url(repo, "/collaborators?affiliation=all");
        self.get_paginated(
            &url,
            None,
            &format!("Failed to list collaborators of {}", repo.full_name),
        )
        .await
    }

    async fn add_collaborator(
        &self,
        repo: &RepoHandle,
        login: &str,
        permission: PermissionLevel,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, &format!("/collaborators/{}", urlencoding::encode(login)));
        let body = json!({ "permission": permission.to_string() });
        self.send_json(
            Method::PUT,
            &url,
            &body,
            &format!("Failed to add {} to {}", login, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn list_repo_teams(&self, repo: &RepoHandle) -> Result<Vec<Team>, PlatformError> {
        let url = self.repo_url(repo, "/teams");
        self.get_paginated(&url, None, &format!("Failed to list teams of {}", repo.full_name))
            .await
    }

    async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>, PlatformError> {
        let url = format!("{}/orgs/{}/teams", self.base_url, org);
        self.get_paginated(&url, None, &format!("Failed to list teams of {}", org))
            .await
    }

    async fn set_team_permission(
        &self,
        org: &str,
        team_slug: &str,
        repo: &RepoHandle,
        permission: PermissionLevel,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/orgs/{}/teams/{}/repos/{}/{}",
            self.base_url, org, team_slug, repo.owner, repo.name
        );
        let body = json!({ "permission": permission.to_string() });
        self.send_json(
            Method::PUT,
            &url,
            &body,
            &format!("Failed to set {} permission for team {}", permission, team_slug),
        )
        .await?;
        Ok(())
    }

    async fn get_branch(&self, repo: &RepoHandle, branch: &str) -> Result<Branch, PlatformError> {
        #[derive(Deserialize)]
        struct BranchItem {
            name: String,
            commit: CommitRef,
            #[serde(default)]
            protected: bool,
        }
        #[derive(Deserialize)]
        struct CommitRef {
            sha: String,
        }

        let url = self.repo_url(repo, &format!("/branches/{}", encode_path(branch)));
        let item: BranchItem = self
            .get_json(
                &url,
                &format!("Branch {} not available in {}", branch, repo.full_name),
            )
            .await?;
        Ok(Branch {
            name: item.name,
            sha: item.commit.sha,
            protected: item.protected,
        })
    }

    async fn protect_branch(&self, repo: &RepoHandle, branch: &str) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, &format!("/branches/{}/protection", encode_path(branch)));
        // Empty user and team lists restrict pushes to nobody
        let body = json!({
            "required_status_checks": null,
            "enforce_admins": false,
            "required_pull_request_reviews": null,
            "restrictions": { "users": [], "teams": [] },
        });
        self.send_json(
            Method::PUT,
            &url,
            &body,
            &format!("Failed to protect {} in {}", branch, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn unprotect_branch(
        &self,
        repo: &RepoHandle,
        branch: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, &format!("/branches/{}/protection", encode_path(branch)));
        self.send(
            self.request(Method::DELETE, &url),
            &format!("Failed to unprotect {} in {}", branch, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn set_default_branch(
        &self,
        repo: &RepoHandle,
        branch: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, "");
        let body = json!({ "default_branch": branch });
        self.send_json(
            Method::PATCH,
            &url,
            &body,
            &format!("Failed to set default branch of {}", repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn get_commit(&self, repo: &RepoHandle, sha: &str) -> Result<CommitInfo, PlatformError> {
        #[derive(Deserialize)]
        struct CommitItem {
            sha: String,
            #[serde(default)]
            parents: Vec<ParentItem>,
        }
        #[derive(Deserialize)]
        struct ParentItem {
            sha: String,
        }

        let url = self.repo_url(repo, &format!("/commits/{}", sha));
        let item: CommitItem = self
            .get_json(
                &url,
                &format!("Commit {} not available in {}", sha, repo.full_name),
            )
            .await?;
        Ok(CommitInfo {
            sha: item.sha,
            parents: item.parents.into_iter().map(|p| p.sha).collect(),
        })
    }

    async fn create_or_update_branch_ref(
        &self,
        repo: &RepoHandle,
        branch: &str,
        sha: &str,
    ) -> Result<(), PlatformError> {
        let ref_path = format!("heads/{}", encode_path(branch));
        let context = format!("Failed to point {} at {} in {}", branch, sha, repo.full_name);

        let existing = self
            .send(
                self.request(Method::GET, &self.repo_url(repo, &format!("/git/ref/{}", ref_path))),
                &context,
            )
            .await;

        match existing {
            Ok(_) => {
                let url = self.repo_url(repo, &format!("/git/refs/{}", ref_path));
                let body = json!({ "sha": sha, "force": true });
                self.send_json(Method::PATCH, &url, &body, &context).await?;
            }
            Err(e) if e.is_not_found() => {
                let url = self.repo_url(repo, "/git/refs");
                let body = json!({ "ref": format!("refs/heads/{}", branch), "sha": sha });
                self.send_json(Method::POST, &url, &body, &context).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoHandle,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PRCreateResult, PlatformError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let client = self.octocrab()?;
        let result = client
            .pulls(&repo.owner, &repo.name)
            .create(title, head, base)
            .body(body)
            .draft(false)
            .maintainer_can_modify(false)
            .send()
            .await;

        #[cfg(feature = "telemetry")]
        {
            let duration = start.elapsed();
            debug!(
                repo = %repo.full_name,
                head,
                base,
                success = result.is_ok(),
                duration_ms = duration.as_millis() as u64,
                "GitHub create PR complete"
            );
        }

        let pr = result.map_err(|e| map_octocrab_error(e, "Failed to create PR"))?;
        Ok(PRCreateResult {
            number: pr.number,
            url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
        })
    }

    async fn list_open_pull_requests(
        &self,
        repo: &RepoHandle,
    ) -> Result<Vec<PRSummary>, PlatformError> {
        let client = self.octocrab()?;
        let page = client
            .pulls(&repo.owner, &repo.name)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(PER_PAGE as u8)
            .send()
            .await
            .map_err(|e| map_octocrab_error(e, "Failed to list PRs"))?;

        Ok(page
            .items
            .into_iter()
            .map(|pr| PRSummary {
                number: pr.number,
                title: pr.title.unwrap_or_default(),
                head: pr.head.ref_field,
                base: pr.base.ref_field,
                url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
            })
            .collect())
    }

    async fn dispatch_event(
        &self,
        repo: &RepoHandle,
        event_type: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, "/dispatches");
        let body = json!({ "event_type": event_type });
        self.send_json(
            Method::POST,
            &url,
            &body,
            &format!("Failed to dispatch '{}' to {}", event_type, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn list_workflows(&self, repo: &RepoHandle) -> Result<Vec<Workflow>, PlatformError> {
        let url = self.repo_url(repo, "/actions/workflows");
        self.get_paginated(
            &url,
            Some("workflows"),
            &format!("Failed to list workflows of {}", repo.full_name),
        )
        .await
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepoHandle,
    ) -> Result<Vec<WorkflowRun>, PlatformError> {
        let url = self.repo_url(repo, "/actions/runs");
        self.get_paginated(
            &url,
            Some("workflow_runs"),
            &format!("Failed to list workflow runs of {}", repo.full_name),
        )
        .await
    }

    async fn delete_workflow_run(
        &self,
        repo: &RepoHandle,
        run_id: u64,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(repo, &format!("/actions/runs/{}", run_id));
        self.send(
            self.request(Method::DELETE, &url),
            &format!("Failed to delete run {} of {}", run_id, repo.full_name),
        )
        .await?;
        Ok(())
    }

    async fn list_org_secrets(&self, org: &str) -> Result<Vec<OrgSecret>, PlatformError> {
        let url = format!("{}/orgs/{}/actions/secrets", self.base_url, org);
        self.get_paginated(
            &url,
            Some("secrets"),
            &format!("Failed to list secrets of {}", org),
        )
        .await
    }

    async fn list_secret_repositories(
        &self,
        org: &str,
        secret: &str,
    ) -> Result<Vec<String>, PlatformError> {
        #[derive(Deserialize)]
        struct Item {
            full_name: String,
        }

        let url = format!(
            "{}/orgs/{}/actions/secrets/{}/repositories",
            self.base_url, org, secret
        );
        let items: Vec<Item> = self
            .get_paginated(
                &url,
                Some("repositories"),
                &format!("Failed to list repositories for secret {}", secret),
            )
            .await?;
        Ok(items.into_iter().map(|i| i.full_name).collect())
    }

    async fn list_repo_secrets(&self, repo: &RepoHandle) -> Result<Vec<String>, PlatformError> {
        #[derive(Deserialize)]
        struct Item {
            name: String,
        }

        let url = self.repo_url(repo, "/actions/secrets");
        let items: Vec<Item> = self
            .get_paginated(
                &url,
                Some("secrets"),
                &format!("Failed to list secrets of {}", repo.full_name),
            )
            .await?;
        Ok(items.into_iter().map(|i| i.name).collect())
    }
}
