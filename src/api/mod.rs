// HTTP surface: payment webhooks, marketplace OAuth, checkout and orders

mod error;
pub mod marketplace;
pub mod orders;
pub mod webhooks;

pub(crate) use error::AppError;

pub use marketplace::{create_marketplace_router, MarketplaceAppState};
pub use orders::{create_orders_router, OrdersAppState};
pub use webhooks::{create_webhook_router, WebhookAppState};
