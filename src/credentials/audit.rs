//! Append-only audit trail for secret access.
//!
//! One JSON object per line. Writing an entry never fails the caller: problems are
//! reported through `tracing` and the secret operation carries on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Write,
    Read,
    /// Read requested but no secret file exists
    ReadAttempt,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub message: String,
}

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an entry. Failures are logged, never returned.
    pub async fn record(&self, action: AuditAction, message: impl Into<String>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            action,
            message: message.into(),
        };

        if let Err(e) = self.append(&entry).await {
            warn!(
                path = %self.path.display(),
                action = ?entry.action,
                error = %e,
                "Failed to write audit log entry"
            );
        }
    }

    async fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        super::private_fs::ensure_parent_dir(&self.path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Reads back all entries, skipping lines that do not parse.
    pub async fn entries(&self) -> std::io::Result<Vec<AuditEntry>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}
