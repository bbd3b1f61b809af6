//! GitHub REST client for the review pipeline.
//!
//! Covers the three host API calls the pipeline needs: listing a PR's
//! changed files, fetching a file's content at a ref, and posting the
//! review comment.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const GITHUB_API_URL: &str = "https://api.github.com";

/// Errors from GitHub API calls.
///
/// Transport and API failures are distinct from the empty-content case,
/// which is not an error: `get_file_content` returns an empty string for
/// non-file paths.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Network-level failure.
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success response from the API.
    #[error("GitHub API error: {status} - {body}")]
    Api {
        /// HTTP status code
        status: reqwest::StatusCode,
        /// Response body text
        body: String,
    },
    /// File content could not be decoded to text.
    #[error("Failed to decode file content: {0}")]
    Decode(String),
}

/// A file changed in a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    /// Path of the file within the repository
    pub filename: String,
    /// Change status (added, modified, removed, ...)
    #[serde(default)]
    pub status: Option<String>,
}

/// Contents API response for a single file.
#[derive(Debug, Deserialize)]
struct ContentResponse {
    /// Base64-encoded file content (absent for non-file entries)
    #[serde(default)]
    content: Option<String>,
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client against the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: Option<String>) -> Result<Self, GitHubError> {
        Self::with_base_url(token, GITHUB_API_URL)
    }

    /// Create a client against a custom API base URL (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(
        token: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("tf-reviewer/1.0"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.header(AUTHORIZATION, format!("Bearer {token}"))
        } else {
            request
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GitHubError::Api { status, body })
        }
    }

    /// List the files changed in a pull request.
    pub async fn list_pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<ChangedFile>, GitHubError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/pulls/{pr_number}/files",
            self.base_url
        );

        let response = self.authed(self.client.get(&url)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch a single file's content at a specific ref via the contents
    /// API.
    ///
    /// File entries come back base64-encoded (with embedded newlines);
    /// the decoded text is returned. Non-file entries (directories,
    /// symlinks, anything without a `content` field) yield an empty
    /// string.
    pub async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, GitHubError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/contents/{path}?ref={git_ref}",
            self.base_url
        );

        debug!(owner = %owner, repo = %repo, path = %path, git_ref = %git_ref, "Fetching file content");

        let response = self.authed(self.client.get(&url)).send().await?;
        let response = Self::check(response).await?;

        // Directory listings come back as a JSON array; treat them like
        // any other non-file entry
        let Ok(content_response) = response.json::<ContentResponse>().await else {
            return Ok(String::new());
        };
        let Some(content) = content_response.content else {
            return Ok(String::new());
        };

        // GitHub returns base64 with newlines, so strip whitespace first
        let content_clean: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&content_clean)
            .map_err(|e| GitHubError::Decode(e.to_string()))?;

        String::from_utf8(decoded).map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// Post a comment on a pull request (issues API, addressed by PR
    /// number).
    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/issues/{pr_number}/comments",
            self.base_url
        );

        let response = self
            .authed(self.client.post(&url))
            .json(&json!({ "body": body }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::with_base_url(Some("test-token".to_string()), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_list_pull_request_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/infra/pulls/7/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "filename": "main.tf", "status": "modified" },
                { "filename": "README.md", "status": "added" }
            ])))
            .mount(&server)
            .await;

        let files = client_for(&server)
            .list_pull_request_files("acme", "infra", 7)
            .await
            .unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "main.tf");
    }

    #[tokio::test]
    async fn test_get_file_content_decodes_base64() {
        let server = MockServer::start().await;
        // "resource {}\n" encoded with a newline in the middle, as GitHub
        // serves it
        let encoded = "cmVzb3VyY2Ug\ne30K";
        Mock::given(method("GET"))
            .and(path("/repos/acme/infra/contents/main.tf"))
            .and(query_param("ref", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "file",
                "encoding": "base64",
                "content": encoded
            })))
            .mount(&server)
            .await;

        let content = client_for(&server)
            .get_file_content("acme", "infra", "main.tf", "abc123")
            .await
            .unwrap();
        assert_eq!(content, "resource {}\n");
    }

    #[tokio::test]
    async fn test_get_file_content_non_file_is_empty() {
        let server = MockServer::start().await;
        // Directory listings are arrays with no content field
        Mock::given(method("GET"))
            .and(path("/repos/acme/infra/contents/modules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "type": "file", "name": "vpc.tf" }
            ])))
            .mount(&server)
            .await;

        let content = client_for(&server)
            .get_file_content("acme", "infra", "modules", "abc123")
            .await
            .unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn test_api_failure_is_distinguishable_from_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/infra/contents/main.tf"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_file_content("acme", "infra", "main.tf", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Api { status, .. } if status == 401));
    }
}
