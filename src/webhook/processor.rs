//! Payment notification reconciliation.
//!
//! ```text
//! (payment, id) ──get_payment──▶ external_reference ──get_by_code──▶ order
//!                                                                    │
//!                    approved → ACTIVE, refunded/cancelled → REFUNDED │
//!                    anything else → unchanged                        ▼
//!                                                       update(order + paymentId)
//! ```
//!
//! Every step that finds nothing stops quietly; no order is ever created here.

use super::notification::{Notification, PAYMENT_TOPIC};
use crate::orders::{Order, OrderRepository, OrderStatus};
use crate::payments::{PaymentGateway, PaymentStatus};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a notification did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Topic other than payments
    Ignored,
    /// Provider does not know the payment
    PaymentNotFound,
    MissingExternalReference,
    OrderNotFound,
    Updated { status: OrderStatus },
    /// The order write failed or the order disappeared; logged only
    PersistFailed,
}

pub struct WebhookProcessor {
    payments: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderRepository>,
}

impl WebhookProcessor {
    pub fn new(payments: Arc<dyn PaymentGateway>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { payments, orders }
    }

    pub async fn process_notification(&self, notification: &Notification) -> Result<ReconcileOutcome> {
        self.process_webhook(notification.topic(), notification.resource_id())
            .await
    }

    /// Reconciles the order referenced by a payment notification.
    ///
    /// Safe to call repeatedly with the same notification.
    ///
    /// # Returns
    /// * `Ok(outcome)` - Including every "nothing to do" case
    /// * `Err` - Payment or order lookup failed
    pub async fn process_webhook(&self, topic: &str, resource_id: &str) -> Result<ReconcileOutcome> {
        info!(topic = %topic, resource_id = %resource_id, "Processing webhook");

        if topic != PAYMENT_TOPIC {
            info!(topic = %topic, "Topic ignored");
            return Ok(ReconcileOutcome::Ignored);
        }

        let Some(payment) = self
            .payments
            .get_payment(resource_id)
            .await
            .context("Failed to fetch payment")?
        else {
            warn!(payment_id = %resource_id, "Payment not found");
            return Ok(ReconcileOutcome::PaymentNotFound);
        };

        let Some(external_reference) = payment.external_reference.as_deref().filter(|r| !r.is_empty())
        else {
            warn!(payment_id = %resource_id, "Payment has no external_reference");
            return Ok(ReconcileOutcome::MissingExternalReference);
        };

        let Some(order) = self
            .orders
            .get_by_code(external_reference)
            .await
            .context("Failed to load order")?
        else {
            warn!(order = %external_reference, "Order not found for external_reference");
            return Ok(ReconcileOutcome::OrderNotFound);
        };

        info!(
            order = %external_reference,
            payment_status = %payment.status,
            "Updating order with payment status"
        );

        let updated = Order {
            status: reconciled_status(order.status, &payment.status),
            payment_id: payment.id.clone(),
            ..order
        };

        match self.orders.update(&updated).await {
            Ok(true) => {
                info!(order = %external_reference, status = ?updated.status, "Order updated successfully");
                Ok(ReconcileOutcome::Updated {
                    status: updated.status,
                })
            }
            Ok(false) => {
                error!(order = %external_reference, "Failed to update order: order vanished");
                Ok(ReconcileOutcome::PersistFailed)
            }
            Err(e) => {
                error!(order = %external_reference, error = %e, "Failed to update order");
                Ok(ReconcileOutcome::PersistFailed)
            }
        }
    }
}

/// Order status after a payment reports `payment_status`.
pub fn reconciled_status(current: OrderStatus, payment_status: &PaymentStatus) -> OrderStatus {
    match payment_status {
        PaymentStatus::Approved => OrderStatus::Active,
        PaymentStatus::Refunded | PaymentStatus::Cancelled => OrderStatus::Refunded,
        // A rejected payment may be retried by the buyer
        PaymentStatus::Rejected | PaymentStatus::Other(_) => current,
    }
}
