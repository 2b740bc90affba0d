//! Checkout and customer order endpoints.

use crate::orders::{CartItem, OrderService};
use axum::{extract::State, response::Json, routing::post, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::AppError;

/// Shared state for the order endpoints
#[derive(Clone)]
pub struct OrdersAppState {
    pub orders: Arc<OrderService>,
}

#[derive(Deserialize)]
struct CheckoutRequest {
    #[serde(default)]
    items: Vec<CartItem>,
}

#[derive(Serialize)]
struct CheckoutResponse {
    url: String,
}

#[derive(Deserialize)]
struct CodeRequest {
    code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    valid: bool,
    credits: u32,
    purchase_date: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    code: String,
    generation_id: String,
}

#[derive(Deserialize)]
struct RefundRequest {
    code: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize)]
struct ActionResponse {
    success: bool,
    message: String,
}

/// Create orders router
pub fn create_orders_router(state: OrdersAppState) -> Router {
    Router::new()
        .route("/api/checkout", post(checkout))
        .route("/api/orders/validate", post(validate_code))
        .route("/api/orders/approve", post(approve_generation))
        .route("/api/orders/refund", post(request_refund))
        .with_state(Arc::new(state))
}

/// POST /api/checkout
///
/// Returns the payment provider URL the buyer should be sent to.
async fn checkout(
    State(state): State<Arc<OrdersAppState>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session = state.orders.checkout(&request.items).await?;
    Ok(Json(CheckoutResponse {
        url: session.init_point,
    }))
}

/// POST /api/orders/validate
async fn validate_code(
    State(state): State<Arc<OrdersAppState>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    let order = state.orders.validate_code(&request.code).await?;
    Ok(Json(ValidateResponse {
        valid: true,
        credits: order.credits,
        purchase_date: order.purchase_date,
    }))
}

/// POST /api/orders/approve
async fn approve_generation(
    State(state): State<Arc<OrdersAppState>>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    state
        .orders
        .approve_generation(&request.code, &request.generation_id)
        .await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Model sent to the print queue".to_string(),
    }))
}

/// POST /api/orders/refund
///
/// Only within 24 hours of purchase.
async fn request_refund(
    State(state): State<Arc<OrdersAppState>>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    if let Some(reason) = request.reason.as_deref().filter(|r| !r.is_empty()) {
        info!(order = %request.code, reason = %reason, "Refund requested");
    }

    state.orders.request_refund(&request.code).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Refund processed. The order's credits have been voided.".to_string(),
    }))
}
