//! Webhook payload parsing and signature verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - `sha256=<hex>` value from the `x-hub-signature-256` header
/// * `secret` - Webhook signing secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise. An empty secret
/// rejects every payload.
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    // GitHub prefixes the hex digest with the algorithm name
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    // Compute HMAC-SHA256 over the raw body
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// GitHub PR event payload (simplified)
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action type (opened, closed, synchronize, etc.)
    pub action: String,
    /// Pull request details
    pub pull_request: PullRequest,
    /// Repository info
    pub repository: Repository,
}

/// GitHub Pull Request
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Source branch
    pub head: GitRef,
    /// Target branch
    pub base: GitRef,
}

/// Git reference (branch)
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    /// Branch name
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// SHA
    pub sha: String,
}

/// GitHub Repository
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Full name (owner/repo)
    pub full_name: String,
    /// Repository owner
    pub owner: RepositoryOwner,
}

/// Repository owner
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    /// Owner login
    pub login: String,
}

/// Immutable context for one PR review, extracted from a verified event.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Repository owner login
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// PR number
    pub pr_number: u64,
    /// Base commit SHA
    pub base_sha: String,
    /// Head commit SHA (files are fetched at this ref)
    pub head_sha: String,
}

impl ReviewRequest {
    /// Preference store key for this repository.
    #[must_use]
    pub fn repo_key(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl PullRequestEvent {
    /// Check whether this event should trigger a review.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.action == "opened"
    }

    /// Build the immutable review context from this event.
    #[must_use]
    pub fn review_request(&self) -> ReviewRequest {
        ReviewRequest {
            owner: self.repository.owner.login.clone(),
            repo: self.repository.name.clone(),
            pr_number: self.pull_request.number,
            base_sha: self.pull_request.base.sha.clone(),
            head_sha: self.pull_request.head.sha.clone(),
        }
    }
}
