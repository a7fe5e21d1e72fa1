//! External inspection tool invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::EnrichmentConfig;
use crate::error::EnrichmentError;

/// Placeholder in the argument list replaced by the capture path.
pub const CAPTURE_PLACEHOLDER: &str = "{capture}";

/// Longest stderr excerpt kept in an error.
const STDERR_EXCERPT: usize = 512;

/// Runs the inspection tool over a capture and collects its log files.
#[derive(Debug, Clone)]
pub struct EnrichmentRunner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl EnrichmentRunner {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Run the tool with `work_dir` as its working directory and return the
    /// `.log` files it left there, sorted by name.
    pub async fn run(&self, capture: &Path, work_dir: &Path) -> Result<Vec<PathBuf>, EnrichmentError> {
        let capture_arg = capture.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(CAPTURE_PLACEHOLDER, &capture_arg))
            .collect();

        debug!(command = %self.command, ?args, dir = %work_dir.display(), "Starting enrichment tool");

        let child = Command::new(&self.command)
            .args(&args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EnrichmentError::ToolMissing {
                    command: self.command.clone(),
                },
                _ => EnrichmentError::Io(e),
            })?;

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(EnrichmentError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(EnrichmentError::ExitStatus {
                status: output.status.to_string(),
                stderr: excerpt,
            });
        }

        let logs = collect_logs(work_dir).await?;
        info!(count = logs.len(), "Enrichment tool finished");
        Ok(logs)
    }
}

/// `.log` files directly under `dir`, sorted.
pub async fn collect_logs(dir: &Path) -> Result<Vec<PathBuf>, EnrichmentError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut logs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "log") && entry.file_type().await?.is_file() {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}
