//! Full-page archiving through an external single-file capture tool.
//!
//! The tool is invoked as `<command> [args...] <url> <output-path>` and is
//! expected to write a self-contained HTML snapshot to the output path. The
//! snapshot lives in a temporary directory that is removed once it has been
//! read back.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use thiserror::Error;
use tokio::process::Command;
use url::Url;

pub const DEFAULT_ARCHIVE_COMMAND: &str = "single-file";
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest stderr excerpt carried into error details.
const MAX_STDERR_DETAILS: usize = 2_000;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to start archive tool '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("Archive tool exited with {status}")]
    Failed { status: String, stderr: String },

    #[error("Archive tool produced no snapshot")]
    MissingOutput(#[source] std::io::Error),

    #[error("Archive snapshot is empty")]
    EmptyOutput,

    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Extra context for API responses.
    pub fn details(&self) -> String {
        match self {
            ArchiveError::Spawn { source, .. } => source.to_string(),
            ArchiveError::Failed { stderr, .. } if !stderr.is_empty() => stderr.clone(),
            ArchiveError::MissingOutput(e) | ArchiveError::Io(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

/// A captured page.
#[derive(Debug, Clone)]
pub struct ArchiveSnapshot {
    /// Base64 (standard alphabet) of the HTML snapshot.
    pub archive: String,
    /// RFC 3339 capture time, UTC.
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct Archiver {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_COMMAND, Vec::new(), DEFAULT_ARCHIVE_TIMEOUT)
    }
}

impl Archiver {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub async fn capture(&self, url: &Url) -> Result<ArchiveSnapshot, ArchiveError> {
        let workdir = tempfile::tempdir()?;
        let output: PathBuf = workdir.path().join("snapshot.html");

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(url.as_str())
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ArchiveError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        tracing::info!(url = %url, command = %self.command, "Archiving page");

        // Dropping the wait future on timeout kills the child.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ArchiveError::Timeout(self.timeout))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_DETAILS).collect();
            return Err(ArchiveError::Failed {
                status: result.status.to_string(),
                stderr,
            });
        }

        let html = tokio::fs::read(&output)
            .await
            .map_err(ArchiveError::MissingOutput)?;
        if html.is_empty() {
            return Err(ArchiveError::EmptyOutput);
        }

        Ok(ArchiveSnapshot {
            archive: BASE64.encode(&html),
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}
