//! Configuration for the review service.

use std::env;

/// Review service configuration, loaded from the environment.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// GitHub App identity.
    pub app_id: Option<String>,
    /// Webhook signing secret for signature verification.
    pub webhook_secret: Option<String>,
    /// Path to the GitHub App private key. Part of the configuration
    /// surface; the review pipeline itself authenticates with the token.
    pub private_key_path: Option<String>,
    /// GitHub token with read + comment scope.
    pub github_token: Option<String>,
    /// GitHub API base URL (overridable for tests).
    pub github_api_url: String,
    /// Path to the preferences file.
    pub prefs_path: String,
    /// Ollama completion endpoint.
    pub ollama_url: String,
    /// Model name sent with completion requests.
    pub ollama_model: String,
    /// Linter executable name or path.
    pub tflint_bin: String,
    /// Upper bound on linter runtime, in seconds.
    pub lint_timeout_secs: u64,
    /// Upper bound on the model call, in seconds.
    pub llm_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            app_id: env::var("APP_ID").ok().filter(|s| !s.is_empty()),
            webhook_secret: env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            private_key_path: env::var("PRIVATE_KEY_PATH")
                .ok()
                .filter(|s| !s.is_empty()),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty()),
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            prefs_path: env::var("PREFS_PATH")
                .unwrap_or_else(|_| "user-preferences.json".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434/api/generate".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama2".to_string()),
            tflint_bin: env::var("TFLINT_BIN").unwrap_or_else(|_| "tflint".to_string()),
            lint_timeout_secs: env::var("LINT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            llm_timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        }
    }
}
