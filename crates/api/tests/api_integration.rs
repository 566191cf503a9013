//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::Config;
use api::state::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn config() -> Config {
    let mut config = Config {
        max_retries: 1,
        retry_delay: Duration::from_millis(1),
        tax_rate_bps: 800,
        ..Config::default()
    };
    config.promo_codes.insert("SAVE10".to_string(), 1000);
    config.stock.insert("SKU-001".to_string(), 10);
    config.stock.insert("SKU-002".to_string(), 10);
    config
}

async fn setup_with_state() -> (axum::Router, Arc<AppState>) {
    let state = api::create_default_state(&config()).await.unwrap();
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn setup() -> axum::Router {
    setup_with_state().await.0
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn cart() -> serde_json::Value {
    serde_json::json!({
        "items": [
            { "product_id": "SKU-001", "quantity": 2, "unit_price_cents": 1000 },
            { "product_id": "SKU-002", "quantity": 1, "unit_price_cents": 500 }
        ],
        "promo_code": "SAVE10",
        "ship_to": "1 Main St"
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["workflows"], 4);
}

#[tokio::test]
async fn test_list_workflows() {
    let app = setup().await;

    let response = app.oneshot(get("/workflows")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["checkout", "fulfillment", "payment_capture", "pricing"]
    );
    assert_eq!(json[0]["activities"][4], "reserve_and_authorize");
    assert_eq!(json[0]["options"]["max_retries"], 1);
}

#[tokio::test]
async fn test_pricing_quote() {
    let app = setup().await;

    let response = app
        .oneshot(post_json("/pricing/quote", cart()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["pricing"]["subtotal_cents"], 2500);
    assert_eq!(json["pricing"]["discount_cents"], 250);
    assert_eq!(json["pricing"]["tax_cents"], 180);
    assert_eq!(json["pricing"]["total_cents"], 2430);
    assert!(json["execution_id"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_promo_code_is_bad_request() {
    let app = setup().await;
    let mut body = cart();
    body["promo_code"] = "BOGUS".into();

    let response = app
        .oneshot(post_json("/pricing/quote", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("BOGUS"));
}

#[tokio::test]
async fn test_negative_price_quote_is_bad_request() {
    let app = setup().await;
    let mut body = cart();
    body["items"][0]["unit_price_cents"] = (-1000).into();

    let response = app
        .oneshot(post_json("/pricing/quote", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("negative"));
}

#[tokio::test]
async fn test_overflowing_quote_is_bad_request() {
    let app = setup().await;
    let mut body = cart();
    body["items"][0]["unit_price_cents"] = i64::MAX.into();

    let response = app
        .oneshot(post_json("/pricing/quote", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("out of range"));
}

#[tokio::test]
async fn test_checkout() {
    let (app, state) = setup_with_state().await;

    let response = app.oneshot(post_json("/checkout", cart())).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["order_number"], "ORD-000001");
    assert_eq!(json["reservation_id"], "RES-0001");
    assert_eq!(json["authorization_id"], "AUTH-0001");
    assert_eq!(json["pricing"]["total_cents"], 2430);
    assert_eq!(json["steps"].as_array().unwrap().len(), 6);

    assert_eq!(state.inventory.available("SKU-001").await, 8);
    assert_eq!(state.orders.placed_count().await, 1);
}

#[tokio::test]
async fn test_checkout_payment_declined() {
    let (app, state) = setup_with_state().await;
    state.payments.set_fail_on_authorize(true).await;

    let response = app.oneshot(post_json("/checkout", cart())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["status"], "compensated");
    assert!(json["execution_id"].as_str().is_some());
    assert!(json["error"].as_str().unwrap().contains("reserve_and_authorize"));
    assert_eq!(state.inventory.available("SKU-001").await, 10);
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let app = setup().await;

    let response = app
        .oneshot(post_json(
            "/checkout",
            serde_json::json!({ "items": [], "ship_to": "1 Main St" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_with_invalid_customer_id() {
    let app = setup().await;
    let mut body = cart();
    body["customer_id"] = "not-a-uuid".into();

    let response = app.oneshot(post_json("/checkout", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("customer_id"));
}

#[tokio::test]
async fn test_checkout_after_shutdown() {
    let (app, state) = setup_with_state().await;
    state.shutdown.cancel();

    let response = app.oneshot(post_json("/checkout", cart())).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(state.inventory.reservation_count().await, 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;

    app.clone()
        .oneshot(post_json("/pricing/quote", cart()))
        .await
        .unwrap();
    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("workflow_executions_total"));
}
