//! Marketplace OAuth application configuration.

use crate::config::{MarketplaceEndpoints, Secrets};
use serde::{Deserialize, Serialize};

use super::pkce::CHALLENGE_METHOD;

/// Marketplace OAuth application settings
#[derive(Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Application (client) id
    pub app_id: String,

    /// Application secret (from environment variable)
    pub client_secret: String,

    /// Redirect URI registered with the marketplace
    pub redirect_uri: String,

    /// API base URL (token endpoint and resources)
    pub api_url: String,

    /// Authorization page URL
    pub auth_url: String,
}

impl MarketplaceConfig {
    pub fn new(endpoints: &MarketplaceEndpoints, secrets: &Secrets) -> Self {
        Self {
            app_id: secrets.marketplace_app_id.clone(),
            client_secret: secrets.marketplace_client_secret.clone(),
            redirect_uri: secrets.marketplace_redirect_uri.clone(),
            api_url: endpoints.api_url.trim_end_matches('/').to_string(),
            auth_url: endpoints.auth_url.clone(),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.api_url)
    }

    /// Build authorization URL for the authorization-code flow with PKCE
    pub fn build_auth_url(&self, code_challenge: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&code_challenge={}&code_challenge_method={}",
            self.auth_url,
            urlencoding::encode(&self.app_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(code_challenge),
            CHALLENGE_METHOD
        )
    }
}

impl std::fmt::Debug for MarketplaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceConfig")
            .field("app_id", &self.app_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .finish_non_exhaustive()
    }
}
