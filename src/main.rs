use anyhow::{Context, Result};
use std::sync::Arc;
use storefront::api::{
    create_marketplace_router, create_orders_router, create_webhook_router, MarketplaceAppState,
    OrdersAppState, WebhookAppState,
};
use storefront::config::{Environment, SecretStoreConfig, Secrets, StorefrontConfig};
use storefront::credentials::FileTokenStore;
use storefront::marketplace::{MarketplaceClient, MarketplaceConfig};
use storefront::orders::{JsonFileOrderStore, OrderService};
use storefront::payments::PaymentApiClient;
use storefront::rate_limit::RateLimiter;
use storefront::webhook::WebhookProcessor;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info".into()),
        )
        .init();

    info!("Storefront starting...");

    let environment = Environment::from_env();
    let config = StorefrontConfig::load().context("Failed to load configuration")?;
    let secrets = Secrets::from_env().context("Missing required secret")?;

    info!(
        environment = environment.suffix(),
        bind_addr = %config.server.bind_addr,
        storage = %config.storage.base_path.display(),
        "Configuration loaded"
    );

    let http = Arc::new(
        RateLimiter::new(config.rate_limit.clone()).context("Failed to build HTTP client")?,
    );

    // Marketplace tokens, encrypted with the per-environment key
    let token_store_config =
        SecretStoreConfig::for_environment(environment, &config.storage.base_path, "marketplace");
    let token_store = Arc::new(
        FileTokenStore::from_config(&token_store_config)
            .context("Failed to initialize marketplace token store")?,
    );
    info!(path = %token_store.path().display(), "Token store initialized");

    let marketplace = Arc::new(MarketplaceClient::new(
        MarketplaceConfig::new(&config.marketplace, &secrets),
        token_store,
        Arc::clone(&http),
    ));

    let payments = Arc::new(PaymentApiClient::new(
        &config.payments.api_url,
        secrets.payments_access_token.clone(),
        Arc::clone(&http),
    ));

    let order_store = Arc::new(JsonFileOrderStore::new(config.storage.orders_path()));
    info!(path = %order_store.path().display(), "Order store initialized");

    let order_service = Arc::new(OrderService::new(
        order_store.clone(),
        payments.clone(),
        config.server.public_base_url.clone(),
    ));
    let processor = Arc::new(WebhookProcessor::new(payments, order_store));

    let app = create_webhook_router(WebhookAppState {
        processor,
        webhook_secret: secrets.webhook_secret.clone(),
    })
    .merge(create_marketplace_router(MarketplaceAppState {
        client: marketplace,
        secure_cookies: config.server.public_base_url.starts_with("https://"),
    }))
    .merge(create_orders_router(OrdersAppState {
        orders: order_service,
    }))
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Storefront API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    info!("Storefront stopped");
    Ok(())
}
