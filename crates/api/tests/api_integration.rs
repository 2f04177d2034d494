//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use store::InMemoryStore;
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

fn setup() -> (axum::Router, Arc<api::AppState<InMemoryStore>>) {
    let store = InMemoryStore::new();
    let state = api::create_default_state(store);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_user(app: &axum::Router, name: &str, email: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/users",
        Some(serde_json::json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn create_product(app: &axum::Router, name: &str, price_cents: i64, stock: u32) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/products",
        Some(serde_json::json!({
            "name": name,
            "price": price_cents,
            "stock": stock,
            "category": "test"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn cart_id_for_user(app: &axum::Router, user_id: &str) -> String {
    let (status, json) = send(app, "GET", &format!("/carts/user/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    json["cart_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_creating_a_user_also_creates_their_cart() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;

    let (status, json) = send(&app, "GET", &format!("/carts/user/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"].as_str().unwrap(), user_id);
    assert!(json["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_email_returns_conflict() {
    let (app, _) = setup();
    create_user(&app, "Alice", "alice@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(serde_json::json!({ "name": "Other", "email": "alice@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_product_validation_rejects_negative_price() {
    let (app, _) = setup();
    let (status, _) = send(
        &app,
        "POST",
        "/products",
        Some(serde_json::json!({ "name": "Bad", "price": -100, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_to_cart_with_stock_pre_check() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", 1000, 2).await;
    let cart_id = cart_id_for_user(&app, &user_id).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{product_id}?quantity=2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity"], 2);

    // Merging past the stock level is rejected up front
    let (status, _) = send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{product_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Zero quantity is rejected
    let (status, _) = send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{product_id}?quantity=0"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_purchase_happy_path() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;
    let a = create_product(&app, "A", 1000, 5).await;
    let b = create_product(&app, "B", 1500, 3).await;
    let cart_id = cart_id_for_user(&app, &user_id).await;

    send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{a}?quantity=2"),
        None,
    )
    .await;
    send(&app, "POST", &format!("/carts/{cart_id}/{b}"), None).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/carts/purchase?user_id={user_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["items_purchased"], 3);
    assert_eq!(json["total_amount_cents"], 3500);
    let order_id = json["order"]["order"]["id"].as_str().unwrap().to_string();

    // Stock reduced, cart emptied
    let (_, product) = send(&app, "GET", &format!("/products/{a}"), None).await;
    assert_eq!(product["stock"], 3);
    let (_, cart) = send(&app, "GET", &format!("/carts/{cart_id}"), None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    // The order is queryable with its frozen prices
    let (status, order) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order"]["total"], 3500);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    let (_, total) = send(&app, "GET", &format!("/orders/{order_id}/total"), None).await;
    assert_eq!(total["total_cents"], 3500);
}

#[tokio::test]
async fn test_purchase_of_empty_cart_reports_failure() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/carts/purchase?user_id={user_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Cart is empty");
    assert!(json.get("order").is_none());
}

#[tokio::test]
async fn test_purchase_with_insufficient_stock_reports_details() {
    let (app, state) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;
    let a = create_product(&app, "A", 1000, 5).await;
    let cart_id = cart_id_for_user(&app, &user_id).await;

    send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{a}?quantity=4"),
        None,
    )
    .await;

    // Stock drops after the cart was filled
    use common::ProductId;
    use store::ProductStore;
    let product_id = ProductId::from_uuid(a.parse().unwrap());
    state.store.update_stock(product_id, 1).await.unwrap();

    let (status, json) = send(
        &app,
        "POST",
        &format!("/carts/purchase?user_id={user_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    let details = json["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["product_name"], "A");
    assert_eq!(details[0]["requested"], 4);
    assert_eq!(details[0]["available"], 1);

    // No order was created
    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_purchase_rolled_back_mid_flight_reports_the_failed_line() {
    let (app, state) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;
    let a = create_product(&app, "A", 1000, 5).await;
    let b = create_product(&app, "B", 1500, 5).await;
    let cart_id = cart_id_for_user(&app, &user_id).await;

    send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{a}?quantity=2"),
        None,
    )
    .await;
    send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{b}?quantity=3"),
        None,
    )
    .await;

    // B sells out under this checkout: its stock drops to 1 right
    // after A's line is reduced, past validation but before B's write
    use common::ProductId;
    let b_id = ProductId::from_uuid(b.parse().unwrap());
    state.store.set_stock_after_updates(1, b_id, 1).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/carts/purchase?user_id={user_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("rolled back"));
    let details = json["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["product_name"], "B");
    assert_eq!(details[0]["requested"], 3);
    assert_eq!(details[0]["available"], 1);

    // Compensation removed the order and restored the reduced line
    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert!(orders.as_array().unwrap().is_empty());
    let (_, product) = send(&app, "GET", &format!("/products/{a}"), None).await;
    assert_eq!(product["stock"], 5);
}

#[tokio::test]
async fn test_add_to_cart_rejects_overflowing_quantity() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;
    let product_id = create_product(&app, "Widget", 1000, 2).await;
    let cart_id = cart_id_for_user(&app, &user_id).await;

    send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{product_id}?quantity=1"),
        None,
    )
    .await;

    // u32::MAX would wrap a plain add past the pre-check
    let (status, _) = send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{product_id}?quantity={}", u32::MAX),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, cart) = send(&app, "GET", &format!("/carts/{cart_id}"), None).await;
    assert_eq!(cart["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_purchase_for_unknown_user_is_not_found() {
    let (app, _) = setup();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/carts/purchase?user_id={}", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_restores_stock() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;
    let a = create_product(&app, "A", 2000, 6).await;
    let cart_id = cart_id_for_user(&app, &user_id).await;

    send(
        &app,
        "POST",
        &format!("/carts/{cart_id}/{a}?quantity=4"),
        None,
    )
    .await;
    let (_, purchase) = send(
        &app,
        "POST",
        &format!("/carts/purchase?user_id={user_id}"),
        None,
    )
    .await;
    let order_id = purchase["order"]["order"]["id"].as_str().unwrap();

    let (_, product) = send(&app, "GET", &format!("/products/{a}"), None).await;
    assert_eq!(product["stock"], 2);

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("cancelled"));

    let (_, product) = send(&app, "GET", &format!("/products/{a}"), None).await;
    assert_eq!(product["stock"], 6);
    let (status, _) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_crud() {
    let (app, _) = setup();
    let user_id = create_user(&app, "Alice", "alice@example.com").await;

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/users/{user_id}"),
        Some(serde_json::json!({ "name": "Alicia" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Alicia");
    assert_eq!(json["email"], "alice@example.com");

    let (status, _) = send(&app, "DELETE", &format!("/users/{user_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/users/{user_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_routes_and_ids() {
    let (app, _) = setup();
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send(&app, "GET", &format!("/products/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/orders/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", &format!("/orders/{missing}/cancel"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
