//! Named secret vault (e.g. the hosting provider API token).
//!
//! Unlike the OAuth token store, this one reads its master key from the environment
//! at the point of use and refuses to work without it. Every access is audited.

use super::{encryption, private_fs, AuditAction, AuditLog, CryptoError};
use crate::config::SecretStoreConfig;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("encryption key not found in environment variable {0}")]
    MissingEncryptionKey(String),

    #[error("secret storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("encryption task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Encrypted single-secret store with an audit trail.
pub struct SecretManager {
    config: SecretStoreConfig,
    audit: AuditLog,
}

impl SecretManager {
    pub fn new(config: SecretStoreConfig) -> Self {
        let audit = AuditLog::new(&config.audit_log_path);
        Self { config, audit }
    }

    pub fn config(&self) -> &SecretStoreConfig {
        &self.config
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Encrypts and stores `secret`, replacing any previous value.
    pub async fn save_secret(&self, secret: &str) -> Result<(), SecretError> {
        let key = match self.config.encryption_key() {
            Ok(key) => key,
            Err(e) => {
                self.audit.record(AuditAction::Error, e.to_string()).await;
                return Err(e);
            }
        };

        match self.write_encrypted(secret, key).await {
            Ok(()) => {
                self.audit.record(AuditAction::Write, "Secret saved successfully").await;
                debug!(path = %self.config.storage_path.display(), "Secret saved");
                Ok(())
            }
            Err(e) => {
                self.audit
                    .record(AuditAction::Error, format!("Failed to save secret: {}", e))
                    .await;
                error!(error = %e, "Failed to save secret");
                Err(e)
            }
        }
    }

    /// Returns the stored secret, or `None` when no secret file exists.
    ///
    /// A present but undecryptable file is an error, never `None`.
    pub async fn get_secret(&self) -> Result<Option<String>, SecretError> {
        if !tokio::fs::try_exists(&self.config.storage_path).await.unwrap_or(false) {
            self.audit
                .record(AuditAction::ReadAttempt, "Secret file not found")
                .await;
            return Ok(None);
        }

        let key = match self.config.encryption_key() {
            Ok(key) => key,
            Err(e) => {
                self.audit.record(AuditAction::Error, e.to_string()).await;
                return Err(e);
            }
        };

        match self.read_decrypted(key).await {
            Ok(secret) => {
                self.audit
                    .record(AuditAction::Read, "Secret retrieved successfully")
                    .await;
                Ok(Some(secret))
            }
            Err(e) => {
                self.audit
                    .record(AuditAction::Error, format!("Failed to retrieve secret: {}", e))
                    .await;
                error!(error = %e, "Failed to retrieve secret");
                Err(e)
            }
        }
    }

    async fn write_encrypted(&self, secret: &str, key: String) -> Result<(), SecretError> {
        private_fs::ensure_parent_dir(&self.config.storage_path).await?;

        let secret = secret.to_string();
        let record = tokio::task::spawn_blocking(move || encryption::encrypt(&secret, &key)).await??;

        private_fs::write_private(&self.config.storage_path, &record).await?;
        Ok(())
    }

    async fn read_decrypted(&self, key: String) -> Result<String, SecretError> {
        let record = tokio::fs::read_to_string(&self.config.storage_path).await?;
        let secret = tokio::task::spawn_blocking(move || encryption::decrypt(&record, &key)).await??;
        Ok(secret)
    }
}
