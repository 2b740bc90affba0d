//! Customer-facing order actions.

use super::{Generation, GenerationStatus, Order, OrderRepository, OrderStatus};
use crate::payments::{BackUrls, CheckoutPreference, PaymentGateway, PreferenceItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Hours after purchase during which a customer can refund on their own
const REFUND_WINDOW_HOURS: i64 = 24;

const CURRENCY_ID: &str = "ARS";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("no items provided")]
    EmptyCart,

    #[error("order not found")]
    NotFound,

    #[error("refund window of 24h has expired")]
    RefundWindowExpired,

    #[error("order is not active")]
    Inactive,

    #[error("order has no credits left")]
    NoCredits,

    #[error("payment provider error: {0:#}")]
    Provider(anyhow::Error),

    #[error("order persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

/// Cart line as sent by the storefront UI.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartItem {
    fn to_preference_item(&self) -> PreferenceItem {
        PreferenceItem {
            id: self.id.clone(),
            title: self.title.clone(),
            quantity: self.quantity,
            unit_price: self.price,
            currency_id: CURRENCY_ID.to_string(),
            picture_url: self.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub order_code: String,
    pub preference_id: String,
    /// Provider URL the buyer is redirected to
    pub init_point: String,
}

/// Result of a model generation to attach to an order.
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub prompt: String,
    pub image_url: Option<String>,
    pub model_url: String,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentGateway>,
    public_base_url: String,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentGateway>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            payments,
            public_base_url: public_base_url.into(),
        }
    }

    /// Creates a PENDING order and a payment preference referencing it.
    pub async fn checkout(&self, items: &[CartItem]) -> Result<CheckoutSession, OrderError> {
        if items.is_empty() {
            warn!("Checkout attempt with no items");
            return Err(OrderError::EmptyCart);
        }

        let code = Uuid::new_v4().to_string();
        self.orders
            .create(Order::pending(code.clone(), Utc::now()))
            .await
            .map_err(OrderError::Persistence)?;
        info!(order = %code, items = items.len(), "Order created");

        let preference = CheckoutPreference {
            external_reference: code.clone(),
            items: items.iter().map(CartItem::to_preference_item).collect(),
            back_urls: BackUrls::from_base(&self.public_base_url),
            auto_return: "approved".to_string(),
        };

        let created = self
            .payments
            .create_preference(&preference)
            .await
            .map_err(|e| {
                error!(order = %code, error = %e, "Error creating preference");
                OrderError::Provider(e)
            })?;

        info!(order = %code, preference_id = %created.id, "Preference created");
        Ok(CheckoutSession {
            order_code: code,
            preference_id: created.id,
            init_point: created.init_point,
        })
    }

    /// Marks a generation APPROVED and sends the order to printing.
    ///
    /// An unknown generation id leaves the generations untouched; the order still
    /// moves to PRINTING.
    pub async fn approve_generation(&self, code: &str, generation_id: &str) -> Result<Order, OrderError> {
        let mut order = self.load(code).await?;

        match order.generations.iter_mut().find(|g| g.id == generation_id) {
            Some(generation) => generation.status = GenerationStatus::Approved,
            None => warn!(order = %code, generation_id = %generation_id, "Generation not found"),
        }
        order.status = OrderStatus::Printing;

        self.save(&order).await?;
        info!(order = %code, generation_id = %generation_id, "Model sent to print queue");
        Ok(order)
    }

    /// Refunds an order within the refund window.
    ///
    /// A provider refund failure is logged and the order is still marked REFUNDED.
    pub async fn request_refund(&self, code: &str) -> Result<Order, OrderError> {
        self.request_refund_at(code, Utc::now()).await
    }

    async fn request_refund_at(&self, code: &str, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let mut order = self.load(code).await?;

        if (now - order.purchase_date).num_hours() > REFUND_WINDOW_HOURS {
            return Err(OrderError::RefundWindowExpired);
        }

        if !order.payment_id.is_empty() {
            if let Err(e) = self.payments.refund_payment(&order.payment_id).await {
                error!(order = %code, payment_id = %order.payment_id, error = %e, "Provider refund failed");
            }
        }

        order.status = OrderStatus::Refunded;
        self.save(&order).await?;
        info!(order = %code, "Order refunded");
        Ok(order)
    }

    /// Checks that a code can be used for generations.
    pub async fn validate_code(&self, code: &str) -> Result<Order, OrderError> {
        let order = self.load(code).await?;
        ensure_usable(&order)?;
        Ok(order)
    }

    /// Consumes one credit and appends a PENDING generation.
    pub async fn record_generation(&self, code: &str, new: NewGeneration) -> Result<Generation, OrderError> {
        let mut order = self.load(code).await?;
        ensure_usable(&order)?;

        let generation = Generation {
            id: Uuid::new_v4().to_string(),
            prompt: new.prompt,
            image_url: new.image_url,
            model_url: new.model_url,
            created_at: Utc::now(),
            status: GenerationStatus::Pending,
        };
        order.credits -= 1;
        order.generations.push(generation.clone());

        self.save(&order).await?;
        info!(order = %code, generation_id = %generation.id, credits = order.credits, "Generation recorded");
        Ok(generation)
    }

    async fn load(&self, code: &str) -> Result<Order, OrderError> {
        self.orders
            .get_by_code(code)
            .await
            .map_err(OrderError::Persistence)?
            .ok_or(OrderError::NotFound)
    }

    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        match self.orders.update(order).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(OrderError::NotFound),
            Err(e) => Err(OrderError::Persistence(e)),
        }
    }
}

fn ensure_usable(order: &Order) -> Result<(), OrderError> {
    if order.status != OrderStatus::Active {
        return Err(OrderError::Inactive);
    }
    if order.credits == 0 {
        return Err(OrderError::NoCredits);
    }
    Ok(())
}
