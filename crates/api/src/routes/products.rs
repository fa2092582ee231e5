//! Product endpoints: catalog creation, lookup and the stock boundary.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CategoryId, ProductId};
use delivery::DeliveryStore;
use product::{Money, Product, StockLedger};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::deliveries::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: u32,
    pub category_id: uuid::Uuid,
}

#[derive(Deserialize)]
pub struct StockChangeRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: u32,
    pub category_id: String,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price_cents: product.price.cents(),
            stock: product.stock,
            category_id: product.category_id.to_string(),
            is_available: product.is_available(),
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /products — add a product to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    if req.name.trim().len() < 2 {
        return Err(ApiError::BadRequest(
            "Product name must be at least 2 characters".to_string(),
        ));
    }
    if req.price_cents < 0 {
        return Err(ApiError::BadRequest(
            "Price must be a positive number".to_string(),
        ));
    }

    let product = Product::new(
        req.name,
        req.description,
        Money::from_cents(req.price_cents),
        req.stock,
        CategoryId::from_uuid(req.category_id),
    );
    let stored = state.ledger.insert(product).await?;

    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// GET /products/{id} — look up a product.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let product_id = parse_product_id(&id)?;
    let product = state
        .ledger
        .get(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product with ID '{id}' not found")))?;

    Ok(Json(product.into()))
}

/// POST /products/{id}/stock/reduce — atomically decrement stock.
#[tracing::instrument(skip(state, req))]
pub async fn reduce_stock<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
    Json(req): Json<StockChangeRequest>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let product_id = parse_product_id(&id)?;
    let product = state.ledger.reduce(product_id, req.quantity).await?;
    Ok(Json(product.into()))
}

/// POST /products/{id}/stock/increase — atomically increment stock.
#[tracing::instrument(skip(state, req))]
pub async fn increase_stock<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<String>,
    Json(req): Json<StockChangeRequest>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    L: StockLedger + 'static,
{
    let product_id = parse_product_id(&id)?;
    let product = state.ledger.increase(product_id, req.quantity).await?;
    Ok(Json(product.into()))
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(ProductId::from_uuid(uuid))
}
