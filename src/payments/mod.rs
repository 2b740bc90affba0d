//! Payment provider integration.
//!
//! The storefront talks to the provider for three things:
//!
//! ```text
//! checkout ──create_preference──▶ provider  (returns init_point to redirect the buyer)
//! webhook  ──get_payment────────▶ provider  (status + external_reference)
//! refund   ──refund_payment─────▶ provider
//! ```
//!
//! Callers depend on the [`PaymentGateway`] trait so tests can substitute fakes.

mod client;

pub use client::PaymentApiClient;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Remote payment status as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Refunded,
    Cancelled,
    Rejected,
    /// Any status the storefront does not act on (`pending`, `in_process`, ...)
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Approved => "approved",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Other(status) => status,
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(status: &str) -> Self {
        match status {
            "approved" => PaymentStatus::Approved,
            "refunded" => PaymentStatus::Refunded,
            "cancelled" => PaymentStatus::Cancelled,
            "rejected" => PaymentStatus::Rejected,
            other => PaymentStatus::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let status = String::deserialize(deserializer)?;
        Ok(PaymentStatus::from(status.as_str()))
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of a provider payment the storefront consumes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Payment {
    /// Numeric on the wire; kept as a string locally
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub external_reference: Option<String>,
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "payment id must be a string or number, got {}",
            other
        ))),
    }
}

/// Checkout preference request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutPreference {
    pub external_reference: String,
    pub items: Vec<PreferenceItem>,
    pub back_urls: BackUrls,
    pub auto_return: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl BackUrls {
    /// `<base>/success`, `<base>/failure` and `<base>/pending`.
    pub fn from_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{}/success", base),
            failure: format!("{}/failure", base),
            pending: format!("{}/pending", base),
        }
    }
}

/// Created preference; `init_point` is where the buyer is sent to pay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreferenceCreated {
    pub id: String,
    pub init_point: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Looks up a payment. `Ok(None)` when the provider does not know the id.
    async fn get_payment(&self, payment_id: &str) -> anyhow::Result<Option<Payment>>;

    /// Requests a full refund of a payment.
    async fn refund_payment(&self, payment_id: &str) -> anyhow::Result<()>;

    /// Creates a checkout preference.
    async fn create_preference(&self, preference: &CheckoutPreference) -> anyhow::Result<PreferenceCreated>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_accepts_numeric_id() {
        let payment: Payment = serde_json::from_str(
            r#"{"id": 1234567890, "status": "approved", "external_reference": "ORDER-1", "transaction_amount": 10}"#,
        )
        .unwrap();

        assert_eq!(payment.id, "1234567890");
        assert_eq!(payment.status, PaymentStatus::Approved);
        assert_eq!(payment.external_reference.as_deref(), Some("ORDER-1"));
    }

    #[test]
    fn test_payment_without_external_reference() {
        let payment: Payment =
            serde_json::from_str(r#"{"id": "P1", "status": "in_process", "external_reference": null}"#).unwrap();

        assert_eq!(payment.status, PaymentStatus::Other("in_process".to_string()));
        assert!(payment.external_reference.is_none());
    }

    #[test]
    fn test_payment_rejects_object_id() {
        let result = serde_json::from_str::<Payment>(r#"{"id": {}, "status": "approved"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_display_roundtrip() {
        for status in ["approved", "refunded", "cancelled", "rejected", "pending"] {
            assert_eq!(PaymentStatus::from(status).to_string(), status);
        }
    }

    #[test]
    fn test_back_urls_trim_trailing_slash() {
        let urls = BackUrls::from_base("https://shop.example.com/");
        assert_eq!(urls.success, "https://shop.example.com/success");
        assert_eq!(urls.failure, "https://shop.example.com/failure");
        assert_eq!(urls.pending, "https://shop.example.com/pending");
    }

    #[test]
    fn test_preference_serialization_skips_missing_picture() {
        let item = PreferenceItem {
            id: "figure-1".to_string(),
            title: "Dragon".to_string(),
            quantity: 1,
            unit_price: 1500.0,
            currency_id: "ARS".to_string(),
            picture_url: None,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("picture_url").is_none());
        assert_eq!(json["unit_price"], 1500.0);
    }
}
