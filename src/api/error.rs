use crate::orders::OrderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for the HTTP endpoints.
///
/// Messages are shown to end users; never put provider bodies or internal
/// error chains in them.
#[derive(Debug)]
pub(crate) enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    ServerError(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyCart => AppError::BadRequest("No items provided".to_string()),
            OrderError::NotFound => AppError::NotFound("Order not found".to_string()),
            OrderError::RefundWindowExpired => AppError::BadRequest(
                "The automatic refund period (24h) has expired. Please contact support.".to_string(),
            ),
            OrderError::Inactive => AppError::Forbidden("Order is inactive or refunded".to_string()),
            OrderError::NoCredits => AppError::Forbidden("No credits remaining".to_string()),
            OrderError::Provider(e) => {
                error!(error = %format!("{:#}", e), "Payment provider request failed");
                AppError::BadGateway("Payment provider unavailable".to_string())
            }
            OrderError::Persistence(e) => {
                error!(error = %format!("{:#}", e), "Order storage failed");
                AppError::ServerError("Internal server error".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_internal_detail_not_exposed() {
        let response: Response =
            AppError::from(OrderError::Persistence(anyhow::anyhow!("/var/lib/orders.json: EACCES"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("EACCES"));
        assert_eq!(text, r#"{"error":"Internal server error"}"#);
    }

    #[test]
    fn test_order_error_status_codes() {
        let status = |e: OrderError| AppError::from(e).into_response().status();

        assert_eq!(status(OrderError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(status(OrderError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(OrderError::RefundWindowExpired), StatusCode::BAD_REQUEST);
        assert_eq!(status(OrderError::Inactive), StatusCode::FORBIDDEN);
        assert_eq!(status(OrderError::NoCredits), StatusCode::FORBIDDEN);
        assert_eq!(
            status(OrderError::Provider(anyhow::anyhow!("500"))),
            StatusCode::BAD_GATEWAY
        );
    }
}
