// Integration tests for checkout and order endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront::api::{create_orders_router, OrdersAppState};
use storefront::orders::{
    Generation, GenerationStatus, JsonFileOrderStore, Order, OrderRepository, OrderService, OrderStatus,
};
use storefront::payments::PaymentApiClient;
use storefront::rate_limit::{RateLimiter, RateLimiterConfig};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    orders: Arc<JsonFileOrderStore>,
    _dir: TempDir,
}

fn create_test_app(provider: &ServerGuard) -> TestApp {
    let dir = TempDir::new().unwrap();
    let orders = Arc::new(JsonFileOrderStore::new(dir.path().join("orders.json")));
    let http = Arc::new(
        RateLimiter::new(RateLimiterConfig {
            max_retries: 0,
            base_delay_ms: 1,
            request_timeout_seconds: 5,
        })
        .unwrap(),
    );
    let payments = Arc::new(PaymentApiClient::new(&provider.url(), "APP_USR-test", http));
    let service = OrderService::new(orders.clone(), payments, "https://shop.example.com");

    TestApp {
        router: create_orders_router(OrdersAppState {
            orders: Arc::new(service),
        }),
        orders,
        _dir: dir,
    }
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_response(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn active_order(code: &str, credits: u32) -> Order {
    Order {
        credits,
        status: OrderStatus::Active,
        payment_id: "P1".to_string(),
        ..Order::pending(code, Utc::now())
    }
}

#[tokio::test]
async fn test_checkout_returns_payment_url() {
    let mut provider = Server::new_async().await;
    let preference = provider
        .mock("POST", "/checkout/preferences")
        .match_header("authorization", "Bearer APP_USR-test")
        .match_body(Matcher::PartialJson(json!({
            "auto_return": "approved",
            "items": [{"id": "figure-1", "title": "Dragon", "unit_price": 1500.0, "currency_id": "ARS"}],
            "back_urls": {"pending": "https://shop.example.com/pending"}
        })))
        .with_status(201)
        .with_body(r#"{"id": "pref-1", "init_point": "https://pay.example.com/init?pref=1"}"#)
        .create_async()
        .await;
    let app = create_test_app(&provider);

    let response = app
        .router
        .clone()
        .oneshot(post(
            "/api/checkout",
            json!({"items": [{"id": "figure-1", "title": "Dragon", "quantity": 1, "price": 1500.0}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_response(response).await,
        json!({"url": "https://pay.example.com/init?pref=1"})
    );
    preference.assert_async().await;
}

#[tokio::test]
async fn test_checkout_without_items() {
    let provider = Server::new_async().await;
    let app = create_test_app(&provider);

    let response = app
        .router
        .clone()
        .oneshot(post("/api/checkout", json!({"items": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_response(response).await, json!({"error": "No items provided"}));
}

#[tokio::test]
async fn test_checkout_provider_error_is_not_leaked() {
    let mut provider = Server::new_async().await;
    let _preference = provider
        .mock("POST", "/checkout/preferences")
        .with_status(400)
        .with_body(r#"{"message": "invalid access token APP_USR-test"}"#)
        .create_async()
        .await;
    let app = create_test_app(&provider);

    let response = app
        .router
        .clone()
        .oneshot(post(
            "/api/checkout",
            json!({"items": [{"id": "figure-1", "title": "Dragon", "quantity": 1, "price": 10}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_response(response).await;
    assert!(!json.to_string().contains("APP_USR-test"));
}

#[tokio::test]
async fn test_validate_code() {
    let provider = Server::new_async().await;
    let app = create_test_app(&provider);
    app.orders.create(active_order("ORDER-1", 3)).await.unwrap();
    app.orders
        .create(Order::pending("ORDER-2", Utc::now()))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post("/api/orders/validate", json!({"code": "ORDER-1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_response(response).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["credits"], 3);
    assert!(json["purchaseDate"].is_string());

    let response = app
        .router
        .clone()
        .oneshot(post("/api/orders/validate", json!({"code": "ORDER-2"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .clone()
        .oneshot(post("/api/orders/validate", json!({"code": "nope"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refund_calls_provider() {
    let mut provider = Server::new_async().await;
    let refund = provider
        .mock("POST", "/v1/payments/P1/refunds")
        .with_status(201)
        .with_body(r#"{"id": 1}"#)
        .expect(1)
        .create_async()
        .await;
    let app = create_test_app(&provider);
    app.orders.create(active_order("ORDER-1", 3)).await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post("/api/orders/refund", json!({"code": "ORDER-1", "reason": "changed my mind"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_response(response).await["success"], true);
    assert_eq!(
        app.orders.get_by_code("ORDER-1").await.unwrap().unwrap().status,
        OrderStatus::Refunded
    );
    refund.assert_async().await;
}

#[tokio::test]
async fn test_refund_after_window() {
    let provider = Server::new_async().await;
    let app = create_test_app(&provider);
    app.orders
        .create(Order {
            purchase_date: Utc::now() - Duration::hours(30),
            ..active_order("ORDER-OLD", 3)
        })
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post("/api/orders/refund", json!({"code": "ORDER-OLD"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        app.orders.get_by_code("ORDER-OLD").await.unwrap().unwrap().status,
        OrderStatus::Active
    );
}

#[tokio::test]
async fn test_approve_sends_order_to_printing() {
    let provider = Server::new_async().await;
    let app = create_test_app(&provider);
    app.orders
        .create(Order {
            generations: vec![Generation {
                id: "gen-1".to_string(),
                prompt: "a small dragon".to_string(),
                image_url: None,
                model_url: "https://models.example.com/dragon.glb".to_string(),
                created_at: Utc::now(),
                status: GenerationStatus::Pending,
            }],
            ..active_order("ORDER-1", 2)
        })
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post(
            "/api/orders/approve",
            json!({"code": "ORDER-1", "generationId": "gen-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let order = app.orders.get_by_code("ORDER-1").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Printing);
    assert_eq!(order.generations[0].status, GenerationStatus::Approved);
}
