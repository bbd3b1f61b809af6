//! TFLint subprocess runner.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors from running the linter.
///
/// A non-zero exit status is not an error: linters exit non-zero exactly
/// when they find issues, which is the interesting case. Only failures to
/// run the tool at all are surfaced here.
#[derive(Debug, Error)]
pub enum LintError {
    /// The linter executable was not found on the system.
    #[error("linter executable `{0}` not found")]
    ToolMissing(String),
    /// The linter did not finish within the configured timeout.
    #[error("linter timed out after {0}s")]
    Timeout(u64),
    /// Spawning or collecting the subprocess failed.
    #[error("failed to run linter: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs an external linter over a directory of fetched files.
#[derive(Debug, Clone)]
pub struct LintRunner {
    bin: String,
    timeout: Duration,
}

impl LintRunner {
    /// Create a runner for the given executable with a bounded runtime.
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Run the linter against a directory, requesting JSON output.
    ///
    /// Returns the tool's stdout regardless of exit status; stderr is
    /// substituted when stdout is empty so a diagnostic always comes
    /// back.
    pub async fn run(&self, dir: &Path) -> Result<String, LintError> {
        debug!(bin = %self.bin, dir = %dir.display(), "Running linter");

        let output = Command::new(&self.bin)
            .arg("--format")
            .arg("json")
            .arg(dir)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| LintError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LintError::ToolMissing(self.bin.clone())
                } else {
                    LintError::Io(e)
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            warn!(
                bin = %self.bin,
                code = ?output.status.code(),
                "Linter exited non-zero; capturing output as findings"
            );
        }

        if stdout.is_empty() {
            Ok(String::from_utf8_lossy(&output.stderr).into_owned())
        } else {
            Ok(stdout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(bin: &str) -> LintRunner {
        LintRunner::new(bin, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_missing_executable_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner("definitely-not-a-real-linter")
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, LintError::ToolMissing(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_returns_stdout_as_findings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-tflint");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"issues\":[{\"rule\":\"x\"}]}'\nexit 2\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let output = runner(script.to_str().unwrap())
            .run(dir.path())
            .await
            .unwrap();
        assert!(output.contains("\"issues\""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_distinguishable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-tflint");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = LintRunner::new(script.to_str().unwrap(), Duration::from_millis(100))
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, LintError::Timeout(_)));
    }
}
