//! PostgreSQL integration tests for the delivery store.
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p delivery --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{OrderId, ProductId};
use delivery::{
    Delivery, DeliveryFilter, DeliveryStatus, DeliveryStore, LineItem, NewDelivery, PageRequest,
    PostgresDeliveryStore, StoreError,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/002_create_deliveries.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresDeliveryStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE deliveries")
        .execute(&pool)
        .await
        .unwrap();

    PostgresDeliveryStore::new(pool)
}

fn make_delivery(customer: Option<&str>) -> Delivery {
    Delivery::create(NewDelivery {
        order_id: OrderId::new(),
        delivery_address: "1 Main St".to_string(),
        customer_name: customer.map(String::from),
        customer_phone: None,
        items: vec![LineItem::new(ProductId::new(), 2)],
        estimated_delivery: None,
    })
}

#[tokio::test]
#[serial]
async fn insert_and_retrieve_roundtrip() {
    let store = get_test_store().await;
    let delivery = make_delivery(Some("Alice"));

    store.insert(&delivery).await.unwrap();

    let found = store.get(delivery.id).await.unwrap().unwrap();
    assert_eq!(found.id, delivery.id);
    assert_eq!(found.order_id, delivery.order_id);
    assert_eq!(found.status, DeliveryStatus::Pending);
    assert_eq!(found.items, delivery.items);
    assert_eq!(found.customer_name.as_deref(), Some("Alice"));

    let by_order = store.get_by_order(delivery.order_id).await.unwrap();
    assert_eq!(by_order.unwrap().id, delivery.id);
}

#[tokio::test]
#[serial]
async fn unique_order_constraint_enforced() {
    let store = get_test_store().await;
    let delivery = make_delivery(None);
    store.insert(&delivery).await.unwrap();

    let mut second = make_delivery(None);
    second.order_id = delivery.order_id;

    let result = store.insert(&second).await;
    assert!(matches!(result, Err(StoreError::DuplicateOrder(_))));
}

#[tokio::test]
#[serial]
async fn unique_tracking_constraint_enforced() {
    let store = get_test_store().await;

    let mut first = make_delivery(None);
    first.tracking_number = Some("DEL-20250101-0001".to_string());
    store.insert(&first).await.unwrap();

    let mut second = make_delivery(None);
    store.insert(&second).await.unwrap();

    second.tracking_number = Some("DEL-20250101-0001".to_string());
    let result = store.update(&second).await;
    assert!(matches!(result, Err(StoreError::DuplicateTracking(_))));

    let found = store.get_by_tracking("DEL-20250101-0001").await.unwrap();
    assert_eq!(found.unwrap().id, first.id);
}

#[tokio::test]
#[serial]
async fn update_persists_status_and_tracking() {
    let store = get_test_store().await;
    let mut delivery = make_delivery(None);
    store.insert(&delivery).await.unwrap();

    delivery.status = DeliveryStatus::Confirmed;
    delivery.tracking_number = Some("DEL-20250101-0042".to_string());
    delivery.updated_at = Utc::now();
    store.update(&delivery).await.unwrap();

    let found = store.get(delivery.id).await.unwrap().unwrap();
    assert_eq!(found.status, DeliveryStatus::Confirmed);
    assert_eq!(found.tracking_number.as_deref(), Some("DEL-20250101-0042"));
}

#[tokio::test]
#[serial]
async fn update_missing_delivery_is_not_found() {
    let store = get_test_store().await;
    let result = store.update(&make_delivery(None)).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn list_filters_and_paginates() {
    let store = get_test_store().await;

    let mut confirmed = make_delivery(Some("Alice Smith"));
    confirmed.status = DeliveryStatus::Confirmed;
    store.insert(&confirmed).await.unwrap();

    for i in 0..3 {
        let mut pending = make_delivery(Some("Bob Jones"));
        pending.created_at = Utc::now() - Duration::minutes(i + 1);
        store.insert(&pending).await.unwrap();
    }

    // Status filter
    let filter = DeliveryFilter {
        status: Some(DeliveryStatus::Confirmed),
        ..Default::default()
    };
    let page = store.list(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(page.deliveries.len(), 1);
    assert_eq!(page.deliveries[0].id, confirmed.id);

    // Name substring filter, case-insensitive
    let filter = DeliveryFilter {
        customer_name: Some("smith".to_string()),
        ..Default::default()
    };
    let page = store.list(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(page.deliveries.len(), 1);

    // Pagination, newest first
    let page = store
        .list(&DeliveryFilter::default(), PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(page.deliveries.len(), 2);
    assert_eq!(page.pagination.total_items, 4);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.deliveries[0].id, confirmed.id);
    assert!(page.pagination.has_next_page);

    // Date range filter
    let filter = DeliveryFilter {
        created_from: Some(Utc::now() - Duration::seconds(30)),
        ..Default::default()
    };
    let page = store.list(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(page.deliveries.len(), 1);
}

#[tokio::test]
#[serial]
async fn stats_buckets() {
    let store = get_test_store().await;

    for status in [
        DeliveryStatus::Pending,
        DeliveryStatus::Confirmed,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
        DeliveryStatus::Returned,
    ] {
        let mut delivery = make_delivery(None);
        delivery.status = status;
        store.insert(&delivery).await.unwrap();
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_progress, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 2);
}
