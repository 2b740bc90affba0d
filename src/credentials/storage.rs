//! Encrypted file storage for the marketplace OAuth tokens.
//!
//! The whole `TokenData` bundle is serialized to JSON, encrypted, and written to a
//! single file. Reads never fail: a missing, undecryptable or unparseable file reads
//! as "absent", which callers treat as "re-authenticate".

use super::{encryption, private_fs, SecretError, TokenData};
use crate::config::SecretStoreConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// Persistence contract for the OAuth credential bundle.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Replaces the stored bundle.
    async fn save(&self, tokens: &TokenData) -> Result<()>;

    /// Returns the stored bundle, or `None` when absent or unreadable.
    async fn get(&self) -> Option<TokenData>;
}

/// Token store backed by one encrypted file.
///
/// # Security
/// - Contents are encrypted with a key derived from the master key on every write
/// - File is written owner read/write, parent directory owner-only
pub struct FileTokenStore {
    path: PathBuf,
    master_key: String,
}

impl FileTokenStore {
    /// Creates a store at `path` encrypting with `master_key`.
    pub fn new<P: AsRef<Path>>(path: P, master_key: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            master_key: master_key.into(),
        }
    }

    /// Builds the store for a per-environment configuration.
    ///
    /// Fails with `MissingEncryptionKey` when the configured key variable is unset.
    pub fn from_config(config: &SecretStoreConfig) -> Result<Self, SecretError> {
        let key = config.encryption_key()?;
        Ok(Self::new(&config.storage_path, key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, tokens: &TokenData) -> Result<()> {
        private_fs::ensure_parent_dir(&self.path)
            .await
            .with_context(|| format!("Failed to create token directory for {}", self.path.display()))?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;
        let key = self.master_key.clone();

        // Key derivation is CPU-bound; keep it off the async workers.
        let encrypted = tokio::task::spawn_blocking(move || encryption::encrypt(&json, &key))
            .await
            .context("Encryption task panicked")?
            .context("Failed to encrypt tokens")?;

        private_fs::write_private(&self.path, &encrypted)
            .await
            .with_context(|| format!("Failed to write tokens to {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Stored encrypted marketplace tokens");
        Ok(())
    }

    async fn get(&self) -> Option<TokenData> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read token file");
                return None;
            }
        };

        let key = self.master_key.clone();
        let record = data.clone();
        let decrypted = match tokio::task::spawn_blocking(move || encryption::decrypt(&record, &key)).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Decryption task panicked");
                return None;
            }
        };

        match decrypted {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(tokens) => Some(tokens),
                Err(e) => {
                    error!(error = %e, "Decrypted token data is not valid JSON");
                    None
                }
            },
            Err(crypto_error) => {
                // Files written before encryption was introduced hold plain JSON.
                match serde_json::from_str::<TokenData>(&data) {
                    Ok(tokens) => {
                        warn!(
                            path = %self.path.display(),
                            "Token file holds unencrypted legacy data; it will be encrypted on next save"
                        );
                        Some(tokens)
                    }
                    Err(_) => {
                        error!(
                            path = %self.path.display(),
                            error = %crypto_error,
                            "Token file could not be decrypted and is not legacy JSON"
                        );
                        None
                    }
                }
            }
        }
    }
}

/// Process-local token store, used where nothing should touch disk.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<Option<TokenData>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenData) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, tokens: &TokenData) -> Result<()> {
        *self.tokens.write().await = Some(tokens.clone());
        Ok(())
    }

    async fn get(&self) -> Option<TokenData> {
        self.tokens.read().await.clone()
    }
}
