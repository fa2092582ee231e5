//! HTTP API server with observability for the delivery and product services.
//!
//! Exposes the delivery-creation saga, delivery status updates and
//! queries, and the product stock boundary, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use delivery::{DeliveryService, DeliveryStore};
use metrics_exporter_prometheus::PrometheusHandle;
use product::StockLedger;
use saga::{FulfillmentService, LedgerStockClient};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::deliveries::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, L>(state: Arc<AppState<S, L>>, metrics_handle: PrometheusHandle) -> Router
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/deliveries", post(routes::deliveries::create::<S, L>))
        .route("/deliveries", get(routes::deliveries::list::<S, L>))
        .route("/deliveries/stats", get(routes::deliveries::stats::<S, L>))
        .route("/deliveries/{id}", get(routes::deliveries::get::<S, L>))
        .route(
            "/deliveries/by-order/{order_id}",
            get(routes::deliveries::get_by_order::<S, L>),
        )
        .route(
            "/deliveries/by-tracking/{tracking_number}",
            get(routes::deliveries::get_by_tracking::<S, L>),
        )
        .route(
            "/deliveries/{id}/status",
            post(routes::deliveries::update_status::<S, L>),
        )
        .route(
            "/deliveries/{id}/cancel",
            post(routes::deliveries::cancel::<S, L>),
        )
        .route(
            "/deliveries/{id}/delivered",
            post(routes::deliveries::mark_delivered::<S, L>),
        )
        .route("/delivery-statuses", get(routes::deliveries::statuses))
        .route("/products", post(routes::products::create::<S, L>))
        .route("/products/{id}", get(routes::products::get::<S, L>))
        .route(
            "/products/{id}/stock/reduce",
            post(routes::products::reduce_stock::<S, L>),
        )
        .route(
            "/products/{id}/stock/increase",
            post(routes::products::increase_stock::<S, L>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the given backends.
pub fn create_default_state<S, L>(store: S, ledger: L) -> Arc<AppState<S, L>>
where
    S: DeliveryStore + Clone + 'static,
    L: StockLedger + Clone + 'static,
{
    let delivery_service = DeliveryService::new(store.clone());
    let fulfillment = FulfillmentService::new(store, LedgerStockClient::new(ledger.clone()));

    Arc::new(AppState {
        delivery_service,
        fulfillment,
        ledger,
    })
}
