//! Review pipeline for opened pull requests.
//!
//! The pipeline sequences the collaborators: preference lookup, changed
//! file listing, fetch into a scoped workspace, lint, summarize, comment.
//! Collaborators are injected behind traits so the pipeline is testable
//! without a live network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::github::{ChangedFile, GitHubClient, GitHubError};
use crate::lint::{LintError, LintRunner};
use crate::llm::OllamaClient;
use crate::preferences::PreferenceStore;
use crate::webhooks::ReviewRequest;

/// File extension that triggers a review.
const TRACKED_EXTENSION: &str = ".tf";

/// Source-control host operations the pipeline needs.
#[async_trait]
pub trait FileHost: Send + Sync {
    /// List the files changed in the pull request.
    async fn list_changed_files(
        &self,
        request: &ReviewRequest,
    ) -> Result<Vec<ChangedFile>, GitHubError>;

    /// Fetch one file's content at the PR head commit.
    async fn fetch_file(&self, request: &ReviewRequest, path: &str)
        -> Result<String, GitHubError>;

    /// Post the review comment on the pull request.
    async fn post_comment(&self, request: &ReviewRequest, body: &str) -> Result<(), GitHubError>;
}

#[async_trait]
impl FileHost for GitHubClient {
    async fn list_changed_files(
        &self,
        request: &ReviewRequest,
    ) -> Result<Vec<ChangedFile>, GitHubError> {
        self.list_pull_request_files(&request.owner, &request.repo, request.pr_number)
            .await
    }

    async fn fetch_file(
        &self,
        request: &ReviewRequest,
        path: &str,
    ) -> Result<String, GitHubError> {
        self.get_file_content(&request.owner, &request.repo, path, &request.head_sha)
            .await
    }

    async fn post_comment(&self, request: &ReviewRequest, body: &str) -> Result<(), GitHubError> {
        self.create_issue_comment(&request.owner, &request.repo, request.pr_number, body)
            .await
    }
}

/// Static-analysis tool invoked over the review workspace.
#[async_trait]
pub trait Linter: Send + Sync {
    /// Lint the directory and return the captured output.
    async fn lint(&self, dir: &Path) -> Result<String, LintError>;
}

#[async_trait]
impl Linter for LintRunner {
    async fn lint(&self, dir: &Path) -> Result<String, LintError> {
        self.run(dir).await
    }
}

/// Produces the review summary text. Infallible by contract: endpoint
/// failures degrade to fallback text inside the implementation.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize lint output against the user's priorities.
    async fn summarize(&self, priorities: &str, lint_output: &str) -> String;
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(&self, priorities: &str, lint_output: &str) -> String {
        OllamaClient::summarize(self, priorities, lint_output).await
    }
}

/// Why a run short-circuited without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No preferences stored for the repository.
    NoPreferences,
    /// No tracked-extension files changed in the PR.
    NoTrackedFiles,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The run short-circuited before any workspace or comment existed.
    Skipped(SkipReason),
    /// The full pipeline ran and the comment was posted.
    Completed,
}

/// The `pull_request.opened` review pipeline.
pub struct ReviewPipeline {
    store: PreferenceStore,
    host: Arc<dyn FileHost>,
    linter: Arc<dyn Linter>,
    summarizer: Arc<dyn Summarizer>,
}

impl ReviewPipeline {
    /// Create a pipeline over the given collaborators.
    pub fn new(
        store: PreferenceStore,
        host: Arc<dyn FileHost>,
        linter: Arc<dyn Linter>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            store,
            host,
            linter,
            summarizer,
        }
    }

    /// Run the full review for one opened pull request.
    ///
    /// The review workspace is owned by this call; it is removed on every
    /// exit path, including failures in linting, summarizing, and comment
    /// posting.
    pub async fn run(&self, request: &ReviewRequest) -> Result<ReviewOutcome> {
        let repo_key = request.repo_key();

        let Some(prefs) = self
            .store
            .get(&repo_key)
            .context("Failed to read preferences")?
        else {
            info!(repo = %repo_key, "No preferences stored for repository; skipping review");
            return Ok(ReviewOutcome::Skipped(SkipReason::NoPreferences));
        };

        let files = self
            .host
            .list_changed_files(request)
            .await
            .context("Failed to list changed files")?;

        let tracked: Vec<ChangedFile> = files
            .into_iter()
            .filter(|f| f.filename.ends_with(TRACKED_EXTENSION))
            .collect();

        if tracked.is_empty() {
            info!(
                repo = %repo_key,
                pr = request.pr_number,
                "No Terraform files changed; skipping review"
            );
            return Ok(ReviewOutcome::Skipped(SkipReason::NoTrackedFiles));
        }

        // Uniquely-named workspace; removed recursively when dropped, on
        // success and on every failure path below
        let workspace = tempfile::Builder::new()
            .prefix(&format!("pr-{}-", request.pr_number))
            .tempdir()
            .context("Failed to create review workspace")?;

        info!(
            repo = %repo_key,
            pr = request.pr_number,
            files = tracked.len(),
            workspace = %workspace.path().display(),
            "Fetching changed files"
        );

        for file in &tracked {
            let Some(relative) = safe_relative_path(&file.filename) else {
                warn!(file = %file.filename, "Skipping file with unsafe path");
                continue;
            };

            let content = self
                .host
                .fetch_file(request, &file.filename)
                .await
                .with_context(|| format!("Failed to fetch {}", file.filename))?;

            let dest = workspace.path().join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).context("Failed to create workspace subdirectory")?;
            }
            fs::write(&dest, content)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
        }

        let lint_output = self
            .linter
            .lint(workspace.path())
            .await
            .context("Linter failed to run")?;

        let summary = self
            .summarizer
            .summarize(&prefs.priorities, &lint_output)
            .await;

        self.host
            .post_comment(request, &summary)
            .await
            .context("Failed to post review comment")?;

        debug!(pr = request.pr_number, "Review comment posted");
        Ok(ReviewOutcome::Completed)
    }
}

/// Reduce a host-provided filename to a safe workspace-relative path.
///
/// Rejects absolute paths and any `..` component so a fetched file can
/// never land outside the workspace.
fn safe_relative_path(filename: &str) -> Option<PathBuf> {
    let path = Path::new(filename);
    if path
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(path.to_path_buf())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_relative_path_accepts_nested() {
        assert_eq!(
            safe_relative_path("modules/vpc/main.tf"),
            Some(PathBuf::from("modules/vpc/main.tf"))
        );
    }

    #[test]
    fn test_safe_relative_path_rejects_escapes() {
        assert!(safe_relative_path("../outside.tf").is_none());
        assert!(safe_relative_path("/etc/passwd").is_none());
        assert!(safe_relative_path("a/../../b.tf").is_none());
    }
}
