//! Marketplace OAuth endpoints.
//!
//! Flow:
//! 1. GET /api/auth/marketplace/start → redirect to the marketplace, PKCE verifier
//!    kept in an HttpOnly cookie for 10 minutes
//! 2. Seller authorizes on the marketplace
//! 3. GET /api/auth/marketplace/callback?code=... → exchange with the cookie's
//!    verifier, tokens stored encrypted, cookie cleared

use crate::marketplace::MarketplaceClient;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AppError;

const VERIFIER_COOKIE: &str = "code_verifier";

/// Verifier cookie lifetime (seconds)
const VERIFIER_MAX_AGE: u32 = 600;

/// Shared state for the marketplace endpoints
#[derive(Clone)]
pub struct MarketplaceAppState {
    pub client: Arc<MarketplaceClient>,
    /// Adds `Secure` to the verifier cookie (HTTPS deployments)
    pub secure_cookies: bool,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct MarketplaceCallback {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Serialize)]
struct CallbackResponse {
    message: String,
}

#[derive(Serialize)]
struct ItemsResponse {
    items: Vec<Value>,
}

/// Create marketplace router
pub fn create_marketplace_router(state: MarketplaceAppState) -> Router {
    Router::new()
        .route("/api/auth/marketplace/start", get(oauth_start))
        .route("/api/auth/marketplace/callback", get(oauth_callback))
        .route("/api/marketplace/items", get(list_items))
        .with_state(Arc::new(state))
}

/// GET /api/auth/marketplace/start
async fn oauth_start(State(state): State<Arc<MarketplaceAppState>>) -> Result<Response, AppError> {
    let request = state.client.get_auth_url();
    let cookie = verifier_cookie(&request.code_verifier, VERIFIER_MAX_AGE, state.secure_cookies)?;

    info!("Redirecting to marketplace authorization");

    let mut response = Redirect::temporary(&request.url).into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

/// GET /api/auth/marketplace/callback
///
/// Tokens are never echoed back; the response only confirms success.
async fn oauth_callback(
    State(state): State<Arc<MarketplaceAppState>>,
    Query(callback): Query<MarketplaceCallback>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(error) = callback.error {
        warn!(
            error = %error,
            description = %callback.error_description.unwrap_or_default(),
            "Marketplace authorization failed"
        );
        return Err(AppError::BadRequest("Authorization was not granted".to_string()));
    }

    let code = callback
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing code".to_string()))?;
    let code_verifier = read_cookie(&headers, VERIFIER_COOKIE)
        .ok_or_else(|| AppError::BadRequest("Missing code_verifier".to_string()))?;

    debug!("Exchanging marketplace authorization code");
    state
        .client
        .exchange_code_for_token(&code, &code_verifier)
        .await
        .map_err(|_| AppError::BadGateway("Failed to exchange token".to_string()))?;

    let mut response = Json(CallbackResponse {
        message: "Authentication successful. Tokens stored securely.".to_string(),
    })
    .into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        verifier_cookie("", 0, state.secure_cookies)?,
    );
    Ok(response)
}

/// GET /api/marketplace/items
///
/// Empty list when the seller has not authorized or the marketplace fails.
async fn list_items(State(state): State<Arc<MarketplaceAppState>>) -> Json<ItemsResponse> {
    let items = state.client.get_user_items().await;
    debug!(count = items.len(), "Listing marketplace items");
    Json(ItemsResponse { items })
}

fn verifier_cookie(value: &str, max_age: u32, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        VERIFIER_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|_| AppError::ServerError("Internal server error".to_string()))
}

/// Value of cookie `name` from the request's Cookie headers.
fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
