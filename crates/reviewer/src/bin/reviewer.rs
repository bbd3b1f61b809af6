//! Review service binary.
//!
//! Standalone HTTP service for Terraform PR review webhooks.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reviewer::{
    config::Config, server, GitHubClient, LintRunner, OllamaClient, PreferenceStore,
    ReviewPipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("reviewer=info".parse()?))
        .init();

    info!("Starting review service...");

    // Load configuration
    let config = Config::default();

    if config.webhook_secret.is_none() {
        warn!("WEBHOOK_SECRET is not set; all webhook deliveries will be rejected");
    }
    if config.github_token.is_none() {
        warn!("No GITHUB_TOKEN configured; GitHub API calls will be unauthenticated");
    }

    let store = PreferenceStore::new(&config.prefs_path);

    let github = GitHubClient::with_base_url(config.github_token.clone(), &config.github_api_url)
        .context("Failed to create GitHub client")?;

    let linter = LintRunner::new(
        &config.tflint_bin,
        Duration::from_secs(config.lint_timeout_secs),
    );

    let summarizer = OllamaClient::new(
        &config.ollama_url,
        &config.ollama_model,
        Duration::from_secs(config.llm_timeout_secs),
    )
    .context("Failed to create model client")?;

    let pipeline = ReviewPipeline::new(
        store.clone(),
        Arc::new(github),
        Arc::new(linter),
        Arc::new(summarizer),
    );

    // Build application state
    let state = server::AppState {
        config: config.clone(),
        store,
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Review service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
