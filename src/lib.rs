// Configuration (environment, TOML, secrets)
pub mod config;

// Encryption, token store, named secrets
pub mod credentials;

// Rate-limit-aware outbound HTTP
pub mod rate_limit;

// Marketplace OAuth client
pub mod marketplace;

// Payment provider client
pub mod payments;

// Orders and customer actions
pub mod orders;

// Payment webhook verification and reconciliation
pub mod webhook;

// HTTP APIs
pub mod api;
