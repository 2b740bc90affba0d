//! Encrypted-at-rest secret storage.
//!
//! Two stores share the same primitive (encrypt-then-persist, read-then-decrypt):
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  FileTokenStore           │   │  SecretManager            │
//! │  - marketplace TokenData  │   │  - one named secret       │
//! │  - legacy JSON fallback   │   │  - audit log per access   │
//! └──────────────────────────┘   └──────────────────────────┘
//!              ↓                              ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Encryption Module                                       │
//! │  - PBKDF2-HMAC-SHA512 key derivation, fresh salt per call │
//! │  - AES-256-GCM, fresh IV per call                         │
//! └─────────────────────────────────────────────────────────┘
//!              ↓
//!   single file per store: salt:iv:tag:ciphertext (hex)
//! ```
//!
//! # Security
//!
//! - Master keys come from the environment only; there is no compiled-in fallback
//! - Secret files are created owner read/write, their directories owner-only
//! - Decryption fails closed on any tag mismatch

use serde::{Deserialize, Serialize};

mod audit;
mod encryption;
mod private_fs;
mod secret_manager;
mod storage;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use encryption::{decrypt, encrypt, CryptoError, EncryptedRecord};
pub use secret_manager::{SecretError, SecretManager};
pub use storage::{FileTokenStore, InMemoryTokenStore, TokenStore};

/// Access tokens are refreshed this long before they actually expire.
pub const REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// OAuth credential bundle for the marketplace API.
///
/// Replaced wholesale on every exchange or refresh, never patched in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    /// Marketplace seller id the tokens belong to
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Lifetime of the access token in seconds
    pub expires_in: i64,

    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub token_type: String,

    /// When the credential was issued or refreshed (epoch milliseconds)
    pub created_at: i64,
}

impl TokenData {
    /// Absolute expiry instant in epoch milliseconds.
    pub fn expires_at_ms(&self) -> i64 {
        self.created_at
            .saturating_add(self.expires_in.saturating_mul(1000))
    }

    /// True once `now_ms` is inside the refresh margin (or past expiry).
    pub fn needs_refresh(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms() - REFRESH_MARGIN_MS
    }
}
