use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{
    CreatedObject, GitCommit, GitRef, NewBlob, NewCommit, NewTree, RefUpdate, Repository,
    RunFilter, TreeEntry, WorkflowRun, WorkflowRunsPage,
};
use super::{ActionsApi, GitDataApi, RepoSlug};
use crate::errors::GitHubError;
use crate::util::truncate_chars;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Pinned REST API version sent with every request.
pub const API_VERSION: &str = "2022-11-28";

const USER_AGENT: &str = "autofix";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const LOG_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of characters of an error body kept in `GitHubError::Api`.
const MAX_ERROR_BODY_CHARS: usize = 2000;

/// Authenticated GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GitHubClient {
    /// Build a client that sends `Authorization: Bearer <token>`, the GitHub
    /// JSON media type and the pinned API version on every request.
    pub fn new(token: &str, api_base: &str) -> Result<Self, GitHubError> {
        if token.trim().is_empty() {
            return Err(GitHubError::Config("token is required".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| GitHubError::Config(format!("invalid token: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GitHubError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, GitHubError> {
        let response = request.send().await.map_err(GitHubError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound {
                path: path.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(GitHubError::Api {
            status: status.as_u16(),
            message: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, GitHubError> {
        let response = self.send(request, path).await?;
        let body = response.text().await.map_err(GitHubError::Transport)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let request = self.http.get(self.url(path)).timeout(REQUEST_TIMEOUT);
        self.json(request, path).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GitHubError> {
        let request = self
            .http
            .post(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .json(body);
        self.json(request, path).await
    }
}

#[async_trait]
impl GitDataApi for GitHubClient {
    async fn get_repository(&self, repo: &RepoSlug) -> Result<Repository, GitHubError> {
        self.get_json(&repo.api_path()).await
    }

    async fn get_ref(&self, repo: &RepoSlug, branch: &str) -> Result<GitRef, GitHubError> {
        self.get_json(&format!("{}/git/ref/heads/{}", repo.api_path(), branch))
            .await
    }

    async fn get_commit(&self, repo: &RepoSlug, sha: &str) -> Result<GitCommit, GitHubError> {
        self.get_json(&format!("{}/git/commits/{}", repo.api_path(), sha))
            .await
    }

    async fn create_blob(&self, repo: &RepoSlug, content: &str) -> Result<String, GitHubError> {
        let path = format!("{}/git/blobs", repo.api_path());
        let created: CreatedObject = self
            .post_json(
                &path,
                &NewBlob {
                    content,
                    encoding: "utf-8",
                },
            )
            .await?;
        Ok(created.sha)
    }

    async fn create_tree(
        &self,
        repo: &RepoSlug,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, GitHubError> {
        let path = format!("{}/git/trees", repo.api_path());
        let created: CreatedObject = self
            .post_json(
                &path,
                &NewTree {
                    base_tree,
                    tree: entries,
                },
            )
            .await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoSlug,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, GitHubError> {
        let path = format!("{}/git/commits", repo.api_path());
        let created: CreatedObject = self
            .post_json(
                &path,
                &NewCommit {
                    message,
                    tree,
                    parents,
                },
            )
            .await?;
        Ok(created.sha)
    }

    async fn update_ref(&self, repo: &RepoSlug, branch: &str, sha: &str) -> Result<(), GitHubError> {
        let path = format!("{}/git/refs/heads/{}", repo.api_path(), branch);
        let request = self
            .http
            .patch(self.url(&path))
            .timeout(REQUEST_TIMEOUT)
            .json(&RefUpdate { sha, force: false });
        self.send(request, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn list_runs(
        &self,
        repo: &RepoSlug,
        filter: &RunFilter,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        let path = format!("{}/actions/runs", repo.api_path());
        let request = self
            .http
            .get(self.url(&path))
            .timeout(REQUEST_TIMEOUT)
            .query(&filter.query_pairs());
        let page: WorkflowRunsPage = self.json(request, &path).await?;
        Ok(page.workflow_runs)
    }

    async fn get_run(&self, repo: &RepoSlug, run_id: u64) -> Result<WorkflowRun, GitHubError> {
        self.get_json(&format!("{}/actions/runs/{}", repo.api_path(), run_id))
            .await
    }

    async fn download_run_logs(
        &self,
        repo: &RepoSlug,
        run_id: u64,
    ) -> Result<Vec<u8>, GitHubError> {
        // The endpoint answers with a redirect to short-lived storage.
        let path = format!("{}/actions/runs/{}/logs", repo.api_path(), run_id);
        let request = self
            .http
            .get(self.url(&path))
            .timeout(LOG_DOWNLOAD_TIMEOUT);
        let response = self.send(request, &path).await?;
        let bytes = response.bytes().await.map_err(GitHubError::Transport)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_token() {
        let err = GitHubClient::new("  ", DEFAULT_API_BASE).unwrap_err();
        assert!(matches!(err, GitHubError::Config(_)));
    }

    #[test]
    fn test_new_rejects_token_with_newline() {
        let err = GitHubClient::new("ghp_abc\ndef", DEFAULT_API_BASE).unwrap_err();
        assert!(matches!(err, GitHubError::Config(_)));
    }

    #[test]
    fn test_api_base_trailing_slash_is_trimmed() {
        let client = GitHubClient::new("ghp_abc", "https://ghe.example.com/api/v3/").unwrap();
        assert_eq!(client.api_base(), "https://ghe.example.com/api/v3");
        assert_eq!(
            client.url("/repos/o/r"),
            "https://ghe.example.com/api/v3/repos/o/r"
        );
    }
}
