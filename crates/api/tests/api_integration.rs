//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery::InMemoryDeliveryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use product::InMemoryStockLedger;
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

fn setup() -> axum::Router {
    let store = InMemoryDeliveryStore::new();
    let ledger = InMemoryStockLedger::new();
    let state = api::create_default_state(store, ledger);
    api::create_app(state, get_metrics_handle())
}

async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

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

async fn send_get(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

async fn create_product(app: &axum::Router, name: &str, stock: u32) -> String {
    let (status, json) = send_json(
        app,
        "POST",
        "/products",
        serde_json::json!({
            "name": name,
            "description": format!("{name} description"),
            "price_cents": 1999,
            "stock": stock,
            "category_id": uuid::Uuid::new_v4(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send_get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_delivery_happy_path() {
    let app = setup();
    let product_id = create_product(&app, "Widget", 5).await;
    let order_id = uuid::Uuid::new_v4().to_string();

    let (status, json) = send_json(
        &app,
        "POST",
        "/deliveries",
        serde_json::json!({
            "order_id": order_id,
            "delivery_address": "1 Main St",
            "customer_name": "Alice",
            "order_items": [{ "product_id": product_id, "quantity": 2 }],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["delivery"]["status"], "pending");
    assert!(json["delivery"]["tracking_number"].is_null());
    assert_eq!(json["stock_errors"].as_array().unwrap().len(), 0);

    // Stock was reduced on the product side
    let (_, product) = send_get(&app, &format!("/products/{product_id}")).await;
    assert_eq!(product["stock"], 3);

    // The delivery is findable by order, with enriched line items
    let (status, found) = send_get(&app, &format!("/deliveries/by-order/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["order_items"][0]["product_name"], "Widget");
    assert_eq!(found["order_items"][0]["price_cents"], 1999);
}

#[tokio::test]
async fn test_create_delivery_insufficient_stock() {
    let app = setup();
    let p1 = create_product(&app, "Widget", 5).await;
    let p2 = create_product(&app, "Gadget", 1).await;

    let (status, json) = send_json(
        &app,
        "POST",
        "/deliveries",
        serde_json::json!({
            "order_id": uuid::Uuid::new_v4(),
            "delivery_address": "1 Main St",
            "order_items": [
                { "product_id": p1, "quantity": 2 },
                { "product_id": p2, "quantity": 3 },
            ],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert!(json["delivery"].is_null());

    let errors = json["stock_errors"].as_array().unwrap();
    let gadget = errors
        .iter()
        .find(|e| e["product_id"] == p2.as_str())
        .unwrap();
    assert_eq!(gadget["requested_quantity"], 3);
    assert_eq!(gadget["available_stock"], 1);

    // Zero net stock mutation
    let (_, widget) = send_get(&app, &format!("/products/{p1}")).await;
    assert_eq!(widget["stock"], 5);
    let (_, gadget) = send_get(&app, &format!("/products/{p2}")).await;
    assert_eq!(gadget["stock"], 1);
}

#[tokio::test]
async fn test_duplicate_order_rejected() {
    let app = setup();
    let product_id = create_product(&app, "Widget", 10).await;
    let order_id = uuid::Uuid::new_v4().to_string();

    let body = serde_json::json!({
        "order_id": order_id,
        "delivery_address": "1 Main St",
        "order_items": [{ "product_id": product_id, "quantity": 1 }],
    });

    let (status, _) = send_json(&app, "POST", "/deliveries", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send_json(&app, "POST", "/deliveries", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "Delivery already exists for this order");

    // The second call reserved nothing
    let (_, product) = send_get(&app, &format!("/products/{product_id}")).await;
    assert_eq!(product["stock"], 9);
}

#[tokio::test]
async fn test_status_update_allocates_tracking_once() {
    let app = setup();
    let product_id = create_product(&app, "Widget", 5).await;

    let (_, created) = send_json(
        &app,
        "POST",
        "/deliveries",
        serde_json::json!({
            "order_id": uuid::Uuid::new_v4(),
            "delivery_address": "1 Main St",
            "order_items": [{ "product_id": product_id, "quantity": 1 }],
        }),
    )
    .await;
    let delivery_id = created["delivery"]["id"].as_str().unwrap().to_string();

    let (status, confirmed) = send_json(
        &app,
        "POST",
        &format!("/deliveries/{delivery_id}/status"),
        serde_json::json!({ "status": "confirmed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tracking = confirmed["tracking_number"].as_str().unwrap().to_string();
    assert!(tracking.starts_with("DEL-"));

    let (_, again) = send_json(
        &app,
        "POST",
        &format!("/deliveries/{delivery_id}/status"),
        serde_json::json!({ "status": "confirmed" }),
    )
    .await;
    assert_eq!(again["tracking_number"], tracking.as_str());

    // Lookup by tracking number works
    let (status, by_tracking) =
        send_get(&app, &format!("/deliveries/by-tracking/{tracking}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_tracking["id"], delivery_id.as_str());
}

#[tokio::test]
async fn test_backward_transition_is_conflict() {
    let app = setup();
    let product_id = create_product(&app, "Widget", 5).await;

    let (_, created) = send_json(
        &app,
        "POST",
        "/deliveries",
        serde_json::json!({
            "order_id": uuid::Uuid::new_v4(),
            "delivery_address": "1 Main St",
            "order_items": [{ "product_id": product_id, "quantity": 1 }],
        }),
    )
    .await;
    let delivery_id = created["delivery"]["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/deliveries/{delivery_id}/status"),
        serde_json::json!({ "status": "shipped" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/deliveries/{delivery_id}/status"),
        serde_json::json!({ "status": "confirmed" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("status"));
}

#[tokio::test]
async fn test_cancel_and_stats() {
    let app = setup();
    let product_id = create_product(&app, "Widget", 5).await;

    let (_, created) = send_json(
        &app,
        "POST",
        "/deliveries",
        serde_json::json!({
            "order_id": uuid::Uuid::new_v4(),
            "delivery_address": "1 Main St",
            "order_items": [{ "product_id": product_id, "quantity": 1 }],
        }),
    )
    .await;
    let delivery_id = created["delivery"]["id"].as_str().unwrap().to_string();

    let (status, cancelled) = send_json(
        &app,
        "POST",
        &format!("/deliveries/{delivery_id}/cancel"),
        serde_json::json!({ "reason": "customer request" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "failed");
    assert_eq!(cancelled["notes"], "Cancelled: customer request");
    assert_eq!(cancelled["is_completed"], true);

    let (status, stats) = send_get(&app, "/deliveries/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["failed"], 1);
}

#[tokio::test]
async fn test_product_stock_boundary() {
    let app = setup();
    let product_id = create_product(&app, "Widget", 2).await;

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/products/{product_id}/stock/reduce"),
        serde_json::json!({ "quantity": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Insufficient stock"));

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/products/{product_id}/stock/reduce"),
        serde_json::json!({ "quantity": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/products/{product_id}/stock/increase"),
        serde_json::json!({ "quantity": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stock"], 5);
}

#[tokio::test]
async fn test_delivery_statuses_listing() {
    let app = setup();
    let (status, json) = send_get(&app, "/delivery-statuses").await;
    assert_eq!(status, StatusCode::OK);
    let statuses = json.as_array().unwrap();
    assert_eq!(statuses.len(), 9);
    assert_eq!(statuses[0], "pending");
    assert_eq!(statuses[8], "returned");
}

#[tokio::test]
async fn test_unknown_delivery_is_not_found() {
    let app = setup();
    let (status, _) = send_get(&app, &format!("/deliveries/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
