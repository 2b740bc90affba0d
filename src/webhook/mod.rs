//! Payment provider webhooks.
//!
//! The HTTP handler parses the body into a [`Notification`], checks the
//! `x-signature` header when present, acknowledges immediately and hands the
//! notification to [`WebhookProcessor`] in the background.

mod notification;
mod processor;
mod signature;

pub use notification::{Notification, PAYMENT_TOPIC};
pub use processor::{reconciled_status, ReconcileOutcome, WebhookProcessor};
pub use signature::{manifest, sign, validate_signature, SignatureHeader};
