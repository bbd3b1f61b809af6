//! Terraform pull request review service.
//!
//! This crate provides:
//! - Webhook signature verification and payload parsing
//! - File-backed review preference storage
//! - GitHub REST client for PR files, file contents, and comments
//! - TFLint subprocess runner
//! - Ollama-backed summarizer
//! - The review pipeline orchestrating the above
//! - HTTP server exposing the inbound webhook endpoint (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod config;
pub mod github;
pub mod lint;
pub mod llm;
pub mod preferences;
pub mod review;
pub mod server;
pub mod webhooks;

pub use config::Config;
pub use github::{ChangedFile, GitHubClient, GitHubError};
pub use lint::{LintError, LintRunner};
pub use llm::OllamaClient;
pub use preferences::{PreferenceRecord, PreferenceStore};
pub use review::{ReviewOutcome, ReviewPipeline, SkipReason};
pub use webhooks::{verify_webhook_signature, PullRequestEvent, ReviewRequest};
