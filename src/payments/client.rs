//! HTTP implementation of [`PaymentGateway`] over the rate-limit-aware client.

use super::{CheckoutPreference, Payment, PaymentGateway, PreferenceCreated};
use crate::rate_limit::{RateLimiter, RequestOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PaymentApiClient {
    api_url: String,
    access_token: String,
    http: Arc<RateLimiter>,
}

impl PaymentApiClient {
    pub fn new(api_url: &str, access_token: impl Into<String>, http: Arc<RateLimiter>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            http,
        }
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .header("Accept", "application/json")
            .bearer_auth(self.access_token.as_str())
    }
}

impl std::fmt::Debug for PaymentApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentApiClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for PaymentApiClient {
    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        let url = format!("{}/v1/payments/{}", self.api_url, urlencoding::encode(payment_id));

        let response = match self.http.get(&url, &self.options()).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                debug!(payment_id = %payment_id, "Payment not found at provider");
                return Ok(None);
            }
            Err(e) => return Err(e).context("Payment lookup failed"),
        };

        let payment: Payment = response.json().context("Failed to parse payment")?;
        Ok(Some(payment))
    }

    async fn refund_payment(&self, payment_id: &str) -> Result<()> {
        let url = format!(
            "{}/v1/payments/{}/refunds",
            self.api_url,
            urlencoding::encode(payment_id)
        );

        self.http
            .post(&url, &self.options().json(json!({})))
            .await
            .context("Refund request failed")?;

        info!(payment_id = %payment_id, "Refund requested");
        Ok(())
    }

    async fn create_preference(&self, preference: &CheckoutPreference) -> Result<PreferenceCreated> {
        let url = format!("{}/checkout/preferences", self.api_url);
        let body = serde_json::to_value(preference).context("Failed to serialize preference")?;

        let created: PreferenceCreated = self
            .http
            .post(&url, &self.options().json(body))
            .await
            .context("Preference creation failed")?
            .json()
            .context("Failed to parse preference response")?;

        debug!(
            order = %preference.external_reference,
            preference_id = %created.id,
            "Preference created"
        );
        Ok(created)
    }
}
