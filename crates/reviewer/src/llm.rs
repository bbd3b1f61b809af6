//! Language-model summarization of lint findings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Fallback when the endpoint answers without usable text.
const NO_RESPONSE: &str = "No response from LLM.";

/// Build the review prompt, embedding the user's priorities and the raw
/// lint output verbatim.
#[must_use]
pub fn build_prompt(priorities: &str, lint_output: &str) -> String {
    format!(
        "A user has asked for a Terraform PR review with the following priorities: \"{priorities}\".\n\n\
         Here are the TFLint results for the changed files (in JSON):\n{lint_output}\n\n\
         Please summarize the most important findings for the user, focusing on their stated priorities. \
         If possible, suggest actionable improvements."
    )
}

/// Completion request body (`stream: false` requests a single response).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Completion response body.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Client for an Ollama-style completion endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for the given endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
        })
    }

    /// Request a single non-streamed completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response: GenerateResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        Ok(response
            .response
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }

    /// Summarize lint output against the user's priorities.
    ///
    /// Never fails: endpoint errors degrade to a fallback string so the
    /// orchestrator always has some text to post.
    pub async fn summarize(&self, priorities: &str, lint_output: &str) -> String {
        let prompt = build_prompt(priorities, lint_output);
        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Model endpoint unreachable; posting fallback summary");
                format!("LLM error: {e}")
            }
        }
    }
}
