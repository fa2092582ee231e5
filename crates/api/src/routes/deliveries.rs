//! Delivery endpoints: creation (saga-backed), status updates and queries.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{DeliveryId, OrderId, ProductId};
use delivery::{
    Delivery, DeliveryFilter, DeliveryService, DeliveryStats, DeliveryStatus, DeliveryStore,
    LineItem, PageInfo, PageRequest, UpdateStatus,
};
use product::StockLedger;
use saga::{CreateDelivery, CreationOutcome, FulfillmentService, LedgerStockClient, StockClient,
    StockErrorDetail};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DeliveryStore, L: StockLedger> {
    pub delivery_service: DeliveryService<S>,
    pub fulfillment: FulfillmentService<S, LedgerStockClient<L>>,
    pub ledger: L,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub order_id: uuid::Uuid,
    pub delivery_address: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub order_items: Vec<OrderItemRequest>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: uuid::Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct DeliveredRequest {
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub customer_name: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    /// Resolved live from the product service on single-delivery reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

#[derive(Serialize)]
pub struct DeliveryResponse {
    pub id: String,
    pub order_id: String,
    pub status: DeliveryStatus,
    pub delivery_address: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<String>,
    pub actual_delivery: Option<String>,
    pub notes: Option<String>,
    pub order_items: Vec<OrderItemResponse>,
    pub is_completed: bool,
    pub is_in_progress: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct DeliveryCreationResponse {
    pub delivery: Option<DeliveryResponse>,
    pub stock_errors: Vec<StockErrorDetail>,
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct DeliveryListResponse {
    pub deliveries: Vec<DeliveryResponse>,
    pub pagination: PageInfo,
}

fn minimal_response(delivery: Delivery) -> DeliveryResponse {
    let order_items = delivery
        .items
        .iter()
        .map(|item| OrderItemResponse {
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            product_name: None,
            price_cents: None,
        })
        .collect();
    response_with_items(delivery, order_items)
}

fn response_with_items(delivery: Delivery, order_items: Vec<OrderItemResponse>) -> DeliveryResponse {
    DeliveryResponse {
        id: delivery.id.to_string(),
        order_id: delivery.order_id.to_string(),
        status: delivery.status,
        delivery_address: delivery.delivery_address,
        customer_name: delivery.customer_name,
        customer_phone: delivery.customer_phone,
        tracking_number: delivery.tracking_number,
        estimated_delivery: delivery.estimated_delivery.map(|t| t.to_rfc3339()),
        actual_delivery: delivery.actual_delivery.map(|t| t.to_rfc3339()),
        notes: delivery.notes,
        order_items,
        is_completed: delivery.status.is_completed(),
        is_in_progress: delivery.status.is_in_progress(),
        created_at: delivery.created_at.to_rfc3339(),
        updated_at: delivery.updated_at.to_rfc3339(),
    }
}

/// Builds a response with line items enriched from the product service.
async fn enriched_response<S: DeliveryStore, L: StockLedger>(
    state: &AppState<S, L>,
    delivery: Delivery,
) -> DeliveryResponse {
    let client = state.fulfillment.coordinator().client();
    let mut order_items = Vec::with_capacity(delivery.items.len());
    for item in &delivery.items {
        let view = client.fetch(item.product_id).await;
        order_items.push(OrderItemResponse {
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            product_name: view.as_ref().map(|v| v.name.clone()),
            price_cents: view.as_ref().map(|v| v.price.cents()),
        });
    }
    response_with_items(delivery, order_items)
}

// -- Handlers --

/// POST /deliveries — create a delivery, reserving stock via the saga.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Json(req): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<DeliveryCreationResponse>), ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    if req.delivery_address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Delivery address cannot be empty".to_string(),
        ));
    }

    let items: Vec<LineItem> = req
        .order_items
        .iter()
        .map(|item| LineItem::new(ProductId::from_uuid(item.product_id), item.quantity))
        .collect();

    let cmd = CreateDelivery {
        order_id: OrderId::from_uuid(req.order_id),
        delivery_address: req.delivery_address,
        customer_name: req.customer_name,
        customer_phone: req.customer_phone,
        items,
        estimated_delivery: req.estimated_delivery,
    };

    match state.fulfillment.create_delivery(cmd).await? {
        CreationOutcome::Created(delivery) => Ok((
            StatusCode::CREATED,
            Json(DeliveryCreationResponse {
                delivery: Some(minimal_response(delivery)),
                stock_errors: Vec::new(),
                success: true,
                message: "Delivery created successfully and stock has been reserved".to_string(),
            }),
        )),
        CreationOutcome::Rejected {
            stock_errors,
            message,
        } => Ok((
            StatusCode::CONFLICT,
            Json(DeliveryCreationResponse {
                delivery: None,
                stock_errors,
                success: false,
                message,
            }),
        )),
    }
}

/// GET /deliveries/{id} — load a delivery with enriched line items.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let delivery_id = parse_delivery_id(&id)?;
    let delivery = state
        .delivery_service
        .get(delivery_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Delivery {id} not found")))?;

    Ok(Json(enriched_response(&state, delivery).await))
}

/// GET /deliveries/by-order/{order_id} — look up the delivery for an order.
#[tracing::instrument(skip(state))]
pub async fn get_by_order<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(order_id): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let uuid = uuid::Uuid::parse_str(&order_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    let delivery = state
        .delivery_service
        .get_by_order(OrderId::from_uuid(uuid))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No delivery for order {order_id}")))?;

    Ok(Json(enriched_response(&state, delivery).await))
}

/// GET /deliveries/by-tracking/{tracking_number} — look up by tracking number.
#[tracing::instrument(skip(state))]
pub async fn get_by_tracking<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let delivery = state
        .delivery_service
        .get_by_tracking(&tracking_number)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No delivery with tracking number {tracking_number}"))
        })?;

    Ok(Json(enriched_response(&state, delivery).await))
}

/// GET /deliveries — filtered, paginated listing (minimal line items).
#[tracing::instrument(skip(state, query))]
pub async fn list<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DeliveryListResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<DeliveryStatus>().map_err(ApiError::BadRequest))
        .transpose()?;

    let filter = DeliveryFilter {
        status,
        customer_name: query.customer_name,
        created_from: query.date_from,
        created_to: query.date_to,
    };
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(10));

    let result = state.delivery_service.list(&filter, page).await?;

    Ok(Json(DeliveryListResponse {
        deliveries: result.deliveries.into_iter().map(minimal_response).collect(),
        pagination: result.pagination,
    }))
}

/// GET /deliveries/stats — counts by status bucket.
#[tracing::instrument(skip(state))]
pub async fn stats<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
) -> Result<Json<DeliveryStats>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    Ok(Json(state.delivery_service.stats().await?))
}

/// GET /delivery-statuses — all known statuses, in lifecycle order.
pub async fn statuses() -> Json<Vec<&'static str>> {
    Json(DeliveryStatus::ALL.iter().map(|s| s.as_str()).collect())
}

/// POST /deliveries/{id}/status — move a delivery to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let delivery_id = parse_delivery_id(&id)?;
    let status: DeliveryStatus = req.status.parse().map_err(ApiError::BadRequest)?;

    let mut cmd = UpdateStatus::new(delivery_id, status);
    cmd.notes = req.notes;
    cmd.estimated_delivery = req.estimated_delivery;

    let delivery = state.delivery_service.update_status(cmd).await?;
    Ok(Json(minimal_response(delivery)))
}

/// POST /deliveries/{id}/cancel — cancel a delivery (maps to `failed`).
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let delivery_id = parse_delivery_id(&id)?;
    let delivery = state.delivery_service.cancel(delivery_id, req.reason).await?;
    Ok(Json(minimal_response(delivery)))
}

/// POST /deliveries/{id}/delivered — mark a delivery as delivered.
#[tracing::instrument(skip(state, req))]
pub async fn mark_delivered<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
    Json(req): Json<DeliveredRequest>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let delivery_id = parse_delivery_id(&id)?;
    let delivery = state
        .delivery_service
        .mark_delivered(delivery_id, req.notes)
        .await?;
    Ok(Json(minimal_response(delivery)))
}

fn parse_delivery_id(id: &str) -> Result<DeliveryId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(DeliveryId::from_uuid(uuid))
}
