//! Marketplace OAuth client.
//!
//! Token lifecycle over the stored `TokenData`:
//!
//! ```text
//!   Absent ──exchange_code_for_token──▶ Valid ──(now ≥ expiry − 5 min)──▶ Expired
//!                                         ▲                               │
//!                                         └──────refresh_access_token─────┘
//! ```
//!
//! `get_valid_access_token` is the only way other components obtain a token.

use super::exchange::TokenResponse;
use super::pkce::PkcePair;
use super::provider::MarketplaceConfig;
use crate::credentials::{TokenData, TokenStore};
use crate::rate_limit::{RateLimiter, RequestOptions};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Items requested per search page
const SEARCH_PAGE_SIZE: u64 = 50;

/// Item ids per multi-get request (provider batch limit)
const DETAILS_CHUNK_SIZE: usize = 20;

/// Authorization redirect plus the verifier the caller must keep for the exchange.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
    pub url: String,
    pub code_verifier: String,
}

#[derive(Deserialize, Debug)]
struct SearchPage {
    paging: Paging,
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct Paging {
    total: u64,
}

/// Multi-get wraps each item as `{code, body}`.
#[derive(Deserialize, Debug)]
struct ItemEnvelope {
    #[serde(default)]
    body: Value,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct MarketplaceClient {
    config: MarketplaceConfig,
    token_store: Arc<dyn TokenStore>,
    http: Arc<RateLimiter>,
    /// Serialises refreshes so concurrent callers share one network refresh.
    refresh_lock: Mutex<()>,
}

impl MarketplaceClient {
    pub fn new(config: MarketplaceConfig, token_store: Arc<dyn TokenStore>, http: Arc<RateLimiter>) -> Self {
        Self {
            config,
            token_store,
            http,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Builds the authorization URL with a fresh PKCE pair.
    pub fn get_auth_url(&self) -> AuthorizationRequest {
        let pkce = PkcePair::generate();
        AuthorizationRequest {
            url: self.config.build_auth_url(&pkce.challenge),
            code_verifier: pkce.verifier,
        }
    }

    /// Exchanges an authorization code (plus its PKCE verifier) and stores the tokens.
    pub async fn exchange_code_for_token(&self, code: &str, code_verifier: &str) -> Result<TokenData> {
        let result = self.request_code_exchange(code, code_verifier).await;
        if let Err(e) = &result {
            error!(error = %e, "Error exchanging authorization code");
        }
        result
    }

    async fn request_code_exchange(&self, code: &str, code_verifier: &str) -> Result<TokenData> {
        debug!("Exchanging authorization code for token at {}", self.config.token_url());

        let options = RequestOptions::new()
            .header("Accept", "application/json")
            .form([
                ("grant_type", "authorization_code"),
                ("client_id", self.config.app_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", code_verifier),
            ]);

        let response: TokenResponse = self
            .http
            .post(&self.config.token_url(), &options)
            .await
            .context("Token exchange request failed")?
            .json()
            .context("Failed to parse token response")?;

        let tokens = response.into_token_data(now_ms());
        self.token_store
            .save(&tokens)
            .await
            .context("Failed to store tokens")?;

        info!(
            user_id = ?tokens.user_id,
            expires_in = tokens.expires_in,
            has_refresh_token = !tokens.refresh_token.is_empty(),
            "Marketplace authorization completed"
        );
        Ok(tokens)
    }

    /// Refreshes `current_tokens`, stores the merged bundle and returns the new access token.
    pub async fn refresh_access_token(&self, current_tokens: &TokenData) -> Result<String> {
        let result = self.request_refresh(current_tokens).await;
        if let Err(e) = &result {
            error!(error = %e, "Error refreshing access token");
        }
        result
    }

    async fn request_refresh(&self, current_tokens: &TokenData) -> Result<String> {
        let options = RequestOptions::new()
            .header("Accept", "application/json")
            .form([
                ("grant_type", "refresh_token"),
                ("client_id", self.config.app_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", current_tokens.refresh_token.as_str()),
            ]);

        let response: TokenResponse = self
            .http
            .post(&self.config.token_url(), &options)
            .await
            .context("Token refresh request failed")?
            .json()
            .context("Failed to parse refresh response")?;

        let tokens = response.merge_refresh(current_tokens, now_ms());
        self.token_store
            .save(&tokens)
            .await
            .context("Failed to store refreshed tokens")?;

        debug!(expires_in = tokens.expires_in, "Access token refreshed");
        Ok(tokens.access_token)
    }

    /// Returns an access token that is not inside the refresh margin, refreshing if needed.
    ///
    /// # Returns
    /// * `Ok(Some(token))` - Valid access token
    /// * `Ok(None)` - No stored tokens (re-authenticate)
    /// * `Err` - Refresh was needed and failed
    pub async fn get_valid_access_token(&self) -> Result<Option<String>> {
        let Some(tokens) = self.token_store.get().await else {
            return Ok(None);
        };
        if !tokens.needs_refresh(now_ms()) {
            return Ok(Some(tokens.access_token));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        let Some(tokens) = self.token_store.get().await else {
            return Ok(None);
        };
        if !tokens.needs_refresh(now_ms()) {
            return Ok(Some(tokens.access_token));
        }

        self.refresh_access_token(&tokens).await.map(Some)
    }

    /// Fetches every active item of the authorized seller.
    ///
    /// Never fails: missing tokens or any provider error yield an empty list.
    pub async fn get_user_items(&self) -> Vec<Value> {
        let access_token = match self.get_valid_access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(error = %e, "No valid access token for item listing");
                return Vec::new();
            }
        };

        let Some(user_id) = self.token_store.get().await.and_then(|t| t.user_id) else {
            return Vec::new();
        };

        match self.fetch_user_items(user_id, &access_token).await {
            Ok(items) => items,
            Err(e) => {
                error!(user_id, error = %e, "Error fetching marketplace items");
                Vec::new()
            }
        }
    }

    async fn fetch_user_items(&self, user_id: i64, access_token: &str) -> Result<Vec<Value>> {
        let search_url = format!("{}/users/{}/items/search", self.config.api_url, user_id);

        let mut item_ids: Vec<String> = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let options = RequestOptions::new()
                .query("status", "active")
                .query("access_token", access_token)
                .query("offset", offset)
                .query("limit", SEARCH_PAGE_SIZE);

            let page: SearchPage = self
                .http
                .get(&search_url, &options)
                .await
                .context("Item search request failed")?
                .json()
                .context("Failed to parse item search page")?;

            item_ids.extend(page.results);
            offset += SEARCH_PAGE_SIZE;
            if offset >= page.paging.total {
                break;
            }
        }

        debug!(user_id, count = item_ids.len(), "Collected item ids");

        let items_url = format!("{}/items", self.config.api_url);
        let mut items = Vec::with_capacity(item_ids.len());
        for chunk in item_ids.chunks(DETAILS_CHUNK_SIZE) {
            let options = RequestOptions::new()
                .query("ids", chunk.join(","))
                .query("access_token", access_token);

            let envelopes: Vec<ItemEnvelope> = self
                .http
                .get(&items_url, &options)
                .await
                .context("Item details request failed")?
                .json()
                .context("Failed to parse item details")?;

            items.extend(envelopes.into_iter().map(|envelope| envelope.body));
        }

        Ok(items)
    }
}
