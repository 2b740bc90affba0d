pub mod environment;
pub use environment::{Environment, SecretStoreConfig};

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub use crate::rate_limit::RateLimiterConfig;

/// Complete storefront configuration (non-secret settings).
///
/// Loaded from the TOML file named by `STOREFRONT_CONFIG` when set; every section
/// falls back to its defaults. Secrets never live here, see [`Secrets`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate_limit: RateLimiterConfig,
    #[serde(default)]
    pub marketplace: MarketplaceEndpoints,
    #[serde(default)]
    pub payments: PaymentsEndpoints,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Public URL of the storefront, used for payment back URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Marketplace API endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceEndpoints {
    #[serde(default = "default_marketplace_api_url")]
    pub api_url: String,
    #[serde(default = "default_marketplace_auth_url")]
    pub auth_url: String,
}

fn default_marketplace_api_url() -> String {
    "https://api.mercadolibre.com".to_string()
}

fn default_marketplace_auth_url() -> String {
    "https://auth.mercadolibre.com.ar/authorization".to_string()
}

impl Default for MarketplaceEndpoints {
    fn default() -> Self {
        Self {
            api_url: default_marketplace_api_url(),
            auth_url: default_marketplace_auth_url(),
        }
    }
}

/// Payment provider endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsEndpoints {
    #[serde(default = "default_payments_api_url")]
    pub api_url: String,
}

fn default_payments_api_url() -> String {
    "https://api.mercadopago.com".to_string()
}

impl Default for PaymentsEndpoints {
    fn default() -> Self {
        Self {
            api_url: default_payments_api_url(),
        }
    }
}

/// On-disk storage locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for secret stores and the order database
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
}

fn default_base_path() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
        }
    }
}

impl StorageConfig {
    pub fn orders_path(&self) -> PathBuf {
        self.base_path.join("orders.json")
    }
}

impl StorefrontConfig {
    /// Loads `STOREFRONT_CONFIG` (if set) and applies `DATA_STORAGE_PATH`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("STOREFRONT_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(path) = std::env::var("DATA_STORAGE_PATH") {
            config.storage.base_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<StorefrontConfig> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: StorefrontConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// Credentials for the external services, read from the environment only.
#[derive(Clone)]
pub struct Secrets {
    pub marketplace_app_id: String,
    pub marketplace_client_secret: String,
    pub marketplace_redirect_uri: String,
    pub payments_access_token: String,
    pub webhook_secret: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            marketplace_app_id: required("MELI_APP_ID")?,
            marketplace_client_secret: required("MELI_CLIENT_SECRET")?,
            marketplace_redirect_uri: required("MELI_REDIRECT_URI")?,
            payments_access_token: required("MP_ACCESS_TOKEN")?,
            webhook_secret: required("WEBHOOK_SECRET")?,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("marketplace_app_id", &self.marketplace_app_id)
            .field("marketplace_redirect_uri", &self.marketplace_redirect_uri)
            .finish_non_exhaustive()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}
