//! HTTP server for the review service.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::preferences::PreferenceStore;
use crate::review::{ReviewOutcome, ReviewPipeline};
use crate::webhooks::{verify_webhook_signature, PullRequestEvent};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Preference store.
    pub store: PreferenceStore,
    /// Review pipeline with its collaborators.
    pub pipeline: Arc<ReviewPipeline>,
}

/// Build the HTTP router for the review service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

/// Preference update submitted by the frontend form.
#[derive(Debug, Deserialize)]
struct PreferenceUpdate {
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    priorities: Option<String>,
}

/// Handle the inbound webhook endpoint.
///
/// Two content shapes share this path: a JSON body upserts review
/// preferences; any other body is treated as a source-control webhook
/// delivery, verified, and routed.
async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("application/json") {
        return save_preferences(&state, &body);
    }

    handle_delivery(&state, &headers, &body)
}

/// JSON branch: upsert a preference record.
fn save_preferences(state: &AppState, body: &[u8]) -> (StatusCode, Json<Value>) {
    let update: PreferenceUpdate = match serde_json::from_slice(body) {
        Ok(update) => update,
        Err(e) => {
            debug!(error = %e, "Malformed preference body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON body" })),
            );
        }
    };

    let Some(repo) = update.repo.filter(|r| !r.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing repo" })),
        );
    };

    let priorities = update.priorities.unwrap_or_default();
    match state.store.set(&repo, &priorities) {
        Ok(()) => {
            info!(repo = %repo, "Saved review preferences");
            (StatusCode::OK, Json(json!({ "ok": true })))
        }
        Err(e) => {
            error!(repo = %repo, error = %e, "Failed to save preferences");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save preferences" })),
            )
        }
    }
}

/// Webhook branch: verify the delivery, then dispatch opened PRs to the
/// review pipeline as a background task.
fn handle_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> (StatusCode, Json<Value>) {
    let invalid = || {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "Invalid webhook" })),
        )
    };

    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received webhook delivery"
    );

    // An unset secret rejects every delivery
    let Some(secret) = &state.config.webhook_secret else {
        warn!("No webhook secret configured; rejecting delivery");
        return invalid();
    };

    if !verify_webhook_signature(body, signature, secret) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return invalid();
    }

    if event_type != "pull_request" {
        debug!(event_type = %event_type, "Ignoring non-pull_request event");
        return (StatusCode::OK, Json(json!({ "ok": true })));
    }

    let event: PullRequestEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            warn!(delivery_id = %delivery_id, error = %e, "Failed to parse pull_request payload");
            return invalid();
        }
    };

    if !event.is_opened() {
        debug!(action = %event.action, "Ignoring non-opened pull_request action");
        return (StatusCode::OK, Json(json!({ "ok": true })));
    }

    // Fire and forget: the delivery is acknowledged now; the review runs
    // in the background and reports through logs only
    let pipeline = state.pipeline.clone();
    let request = event.review_request();
    let delivery_id = delivery_id.to_string();
    tokio::spawn(async move {
        match pipeline.run(&request).await {
            Ok(ReviewOutcome::Completed) => {
                info!(
                    delivery_id = %delivery_id,
                    pr = request.pr_number,
                    "Review completed"
                );
            }
            Ok(ReviewOutcome::Skipped(reason)) => {
                info!(
                    delivery_id = %delivery_id,
                    pr = request.pr_number,
                    reason = ?reason,
                    "Review skipped"
                );
            }
            Err(e) => {
                error!(
                    delivery_id = %delivery_id,
                    pr = request.pr_number,
                    error = %e,
                    "Review failed"
                );
            }
        }
    });

    (StatusCode::OK, Json(json!({ "ok": true })))
}
