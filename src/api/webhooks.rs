//! Payment notification endpoint.

use crate::webhook::{validate_signature, Notification, WebhookProcessor};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::AppError;

const SIGNATURE_HEADER: &str = "x-signature";

/// Shared state for the webhook endpoint
#[derive(Clone)]
pub struct WebhookAppState {
    pub processor: Arc<WebhookProcessor>,
    pub webhook_secret: String,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookAppState) -> Router {
    Router::new()
        .route("/api/webhooks/payments", post(receive_notification))
        .with_state(Arc::new(state))
}

/// POST /api/webhooks/payments
///
/// Acknowledges every parseable notification with `200 {"status":"OK"}`.
/// Signature failures and reconciliation errors are logged only, so the
/// provider never enters a retry loop against this handler.
async fn receive_notification(
    State(state): State<Arc<WebhookAppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Webhook body is not valid JSON");
        AppError::BadRequest("Invalid JSON body".to_string())
    })?;

    if let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        if validate_signature(signature, &body, &state.webhook_secret) {
            debug!("Signature validation successful");
        } else {
            warn!("Signature validation failed for webhook");
        }
    }

    match Notification::from_body(&body) {
        Some(notification) => {
            info!(
                topic = %notification.topic(),
                resource_id = %notification.resource_id(),
                "Incoming webhook"
            );

            let processor = state.processor.clone();
            tokio::spawn(async move {
                if let Err(e) = processor.process_notification(&notification).await {
                    error!(
                        topic = %notification.topic(),
                        resource_id = %notification.resource_id(),
                        error = %format!("{:#}", e),
                        "Async webhook processing error"
                    );
                }
            });
        }
        None => warn!("Missing resource id or topic in webhook body"),
    }

    Ok(Json(json!({ "status": "OK" })))
}
