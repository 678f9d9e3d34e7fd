//! GitHub Content Store
//!
//! Publishes through the Git Data API (trees, commits, refs) and reads the
//! success marker and route list from raw.githubusercontent.com.
//!
//! Every request is sent once. Nothing is retried: the branch ref update is
//! the only externally visible write and it happens last, so a failed run
//! leaves the branch untouched.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{ArtifactSet, ArtifactStore, PublishReceipt, StateStore, StoreError};
use crate::config::{PublishConfig, RepoSlug};
use crate::routes::RouteSource;

/// Default GitHub endpoints
const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";
const API_VERSION: &str = "2022-11-28";

const STATE_TIMEOUT: Duration = Duration::from_secs(15);
const ROUTES_TIMEOUT: Duration = Duration::from_secs(30);

/// `GET /git/ref/...` response
#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

/// Tree and commit creation both answer with at least a `sha`.
#[derive(Debug, Deserialize)]
struct Created {
    sha: String,
}

/// Request body for `POST /git/trees`. No `base_tree`, so the new tree holds
/// only the published files.
fn tree_request(artifacts: &ArtifactSet) -> serde_json::Value {
    let tree: Vec<serde_json::Value> = artifacts
        .iter()
        .map(|(path, content)| {
            serde_json::json!({
                "path": path,
                "mode": "100644",
                "type": "blob",
                "content": content,
            })
        })
        .collect();
    serde_json::json!({ "tree": tree })
}

/// GitHub answers a non-fast-forward ref update with 422 (or 409 when the
/// ref is locked by a concurrent write).
fn is_ref_conflict(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    )
}

/// GitHub-backed state + artifact store
pub struct GitHubStore {
    client: reqwest::Client,
    api_base: String,
    raw_base: String,
    repo: RepoSlug,
    token: Option<SecretString>,
    source_branch: String,
    output_branch: String,
    route_file_path: String,
    state_path: String,
}

impl GitHubStore {
    pub fn new(repo: RepoSlug, config: &PublishConfig, token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("route-tabs/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_base: API_BASE.to_string(),
            raw_base: RAW_BASE.to_string(),
            repo,
            token,
            source_branch: config.source_branch.clone(),
            output_branch: config.output_branch.clone(),
            route_file_path: config.route_file_path.clone(),
            state_path: config.state_path.clone(),
        }
    }

    /// Point the store at other API and raw-content hosts (GitHub Enterprise,
    /// or a local server in tests).
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        raw_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.raw_base = raw_base.into().trim_end_matches('/').to_string();
        self
    }

    fn raw_url(&self, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base,
            self.repo.owner,
            self.repo.repo,
            branch,
            path.trim_start_matches('/')
        )
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.repo.owner, self.repo.repo, endpoint
        )
    }

    /// Get authorization header
    fn auth_header(&self) -> Result<HeaderValue, StoreError> {
        let token = self.token.as_ref().ok_or_else(|| {
            StoreError::MissingCredential(
                "set GITHUB_TOKEN (Actions) or GH_TOKEN (a PAT with repo scope)".to_string(),
            )
        })?;
        HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| StoreError::MissingCredential(format!("invalid token: {}", e)))
    }

    /// Unauthenticated raw GET. `Ok(None)` on 404.
    async fn get_raw(&self, url: &str, timeout: Duration) -> Result<Option<String>, StoreError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                method: "GET".to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(response.text().await?))
    }

    /// Authenticated API call. `Ok(None)` on 404 when `allow_missing`.
    async fn api_call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        allow_missing: bool,
    ) -> Result<Option<T>, StoreError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(AUTHORIZATION, self.auth_header()?)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, url);
        let response = request.send().await?;
        let status = response.status();

        if allow_missing && status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| StoreError::Parse(format!("{} {}: {}", method, url, e)))
    }

    async fn api_required<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, StoreError> {
        self.api_call(method, url, body, false)
            .await?
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }

    /// Make sure the output branch exists and return its head commit. A
    /// missing branch is created from the source branch head.
    async fn ensure_output_branch(&self) -> Result<String, StoreError> {
        let ref_url = self.api_url(&format!("git/ref/heads/{}", self.output_branch));
        if let Some(existing) = self
            .api_call::<GitRef>(Method::GET, &ref_url, None, true)
            .await?
        {
            return Ok(existing.object.sha);
        }

        info!(
            "Branch '{}' missing, creating it from '{}'",
            self.output_branch, self.source_branch
        );
        let source_url = self.api_url(&format!("git/ref/heads/{}", self.source_branch));
        let source: GitRef = self.api_required(Method::GET, &source_url, None).await?;

        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", self.output_branch),
            "sha": source.object.sha,
        });
        let _: serde_json::Value = self
            .api_required(Method::POST, &self.api_url("git/refs"), Some(&body))
            .await?;

        Ok(source.object.sha)
    }

    /// Non-forced fast-forward of the output branch.
    async fn advance_branch(&self, commit_sha: &str) -> Result<(), StoreError> {
        let url = self.api_url(&format!("git/refs/heads/{}", self.output_branch));
        let body = serde_json::json!({ "sha": commit_sha, "force": false });
        match self
            .api_required::<serde_json::Value>(Method::PATCH, &url, Some(&body))
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Api { status, .. })
                if StatusCode::from_u16(status).is_ok_and(is_ref_conflict) =>
            {
                Err(StoreError::RefConflict(self.output_branch.clone()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl StateStore for GitHubStore {
    fn state_path(&self) -> &str {
        &self.state_path
    }

    async fn fetch_state(&self) -> Result<Option<String>, StoreError> {
        let url = self.raw_url(&self.output_branch, &self.state_path);
        self.get_raw(&url, STATE_TIMEOUT).await
    }
}

#[async_trait]
impl RouteSource for GitHubStore {
    fn describe(&self) -> String {
        format!("{}@{}:{}", self.repo, self.source_branch, self.route_file_path)
    }

    async fn load_route_list(&self) -> Result<String, StoreError> {
        let url = self.raw_url(&self.source_branch, &self.route_file_path);
        self.get_raw(&url, ROUTES_TIMEOUT)
            .await?
            .ok_or_else(|| StoreError::NotFound(url.clone()))
    }
}

#[async_trait]
impl ArtifactStore for GitHubStore {
    fn display_name(&self) -> String {
        format!("{}@{}", self.repo, self.output_branch)
    }

    async fn publish(
        &self,
        artifacts: &ArtifactSet,
        message: &str,
    ) -> Result<PublishReceipt, StoreError> {
        // Fail before touching the network if there is no credential.
        self.auth_header()?;

        let head = self.ensure_output_branch().await?;

        let tree: Created = self
            .api_required(Method::POST, &self.api_url("git/trees"), Some(&tree_request(artifacts)))
            .await?;
        debug!("Created tree {}", tree.sha);

        let commit_body = serde_json::json!({
            "message": message,
            "tree": tree.sha,
            "parents": [head],
        });
        let commit: Created = self
            .api_required(Method::POST, &self.api_url("git/commits"), Some(&commit_body))
            .await?;
        debug!("Created commit {} on parent {}", commit.sha, head);

        self.advance_branch(&commit.sha).await?;

        Ok(PublishReceipt {
            target: self.output_branch.clone(),
            revision: commit.sha,
            files: artifacts.len(),
        })
    }
}
