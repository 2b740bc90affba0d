//! Orders and the generations they pay for.
//!
//! Status transitions:
//!
//! ```text
//!            approved payment            approve_generation
//! PENDING ─────────────────────▶ ACTIVE ───────────────────▶ PRINTING
//!    │                              │
//!    └──────────────┬───────────────┘
//!                   ▼ refunded/cancelled payment, customer refund
//!               REFUNDED
//! ```
//!
//! Status only changes through payment webhooks or the customer actions in
//! [`OrderService`]; nothing writes it directly.

mod service;
mod store;

pub use service::{CartItem, CheckoutSession, NewGeneration, OrderError, OrderService};
pub use store::JsonFileOrderStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Active,
    Printing,
    Refunded,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    Pending,
    Approved,
    Rejected,
}

/// A model generated for an order. Appended, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub model_url: String,
    pub created_at: DateTime<Utc>,
    pub status: GenerationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Opaque order code, also the payment's external reference
    pub code: String,
    pub purchase_date: DateTime<Utc>,
    pub credits: u32,
    pub status: OrderStatus,
    /// Empty until a payment notification resolves it
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub generations: Vec<Generation>,
}

impl Order {
    /// New PENDING order with no credits.
    pub fn pending(code: impl Into<String>, purchase_date: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            purchase_date,
            credits: 0,
            status: OrderStatus::Pending,
            payment_id: String::new(),
            generations: Vec::new(),
        }
    }
}

/// Order persistence contract.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get_by_code(&self, code: &str) -> anyhow::Result<Option<Order>>;

    /// Replaces the stored order with the same code.
    ///
    /// # Returns
    /// * `Ok(true)` - Order replaced
    /// * `Ok(false)` - No order with that code
    async fn update(&self, order: &Order) -> anyhow::Result<bool>;

    /// Stores a new order. Fails if the code is already taken.
    async fn create(&self, order: Order) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_wire_format() {
        let order = Order {
            generations: vec![Generation {
                id: "gen-1".to_string(),
                prompt: "a small dragon".to_string(),
                image_url: None,
                model_url: "https://models.example.com/dragon.glb".to_string(),
                created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
                status: GenerationStatus::Pending,
            }],
            ..Order::pending("ORDER-1", Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
        };

        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["code"], "ORDER-1");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["paymentId"], "");
        assert_eq!(json["purchaseDate"], "2025-03-01T12:00:00Z");
        assert_eq!(json["generations"][0]["modelUrl"], "https://models.example.com/dragon.glb");
        assert_eq!(json["generations"][0]["status"], "PENDING");
        assert!(json["generations"][0].get("imageUrl").is_none());
    }

    #[test]
    fn test_order_reads_existing_database_entry() {
        let json = r#"{
            "code": "demo-code",
            "purchaseDate": "2025-01-10T09:15:00.000Z",
            "credits": 3,
            "status": "ACTIVE",
            "paymentId": "demo_payment_id",
            "generations": []
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.credits, 3);
        assert_eq!(order.payment_id, "demo_payment_id");
    }
}
