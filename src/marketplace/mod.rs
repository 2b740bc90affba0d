//! Marketplace OAuth integration.
//!
//! Implements the authorization code flow with PKCE:
//! 1. `get_auth_url` → redirect the seller, keep the verifier in a short-lived cookie
//! 2. Seller authorizes on the marketplace
//! 3. Marketplace redirects back with `code`
//! 4. `exchange_code_for_token` → tokens stored encrypted
//! 5. `get_valid_access_token` refreshes transparently from then on

mod client;
mod exchange;
pub mod pkce;
mod provider;


pub use client::{AuthorizationRequest, MarketplaceClient};
pub use provider::MarketplaceConfig;
