//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use delivery::{DeliveryError, StoreError};
use product::StockError;
use saga::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Delivery service error.
    Delivery(DeliveryError),
    /// Stock ledger error.
    Stock(StockError),
    /// Fulfillment error.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Delivery(err) => delivery_error_to_response(err),
            ApiError::Stock(err) => stock_error_to_response(err),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn delivery_error_to_response(err: DeliveryError) -> (StatusCode, String) {
    match &err {
        DeliveryError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DeliveryError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        DeliveryError::Store(store_err) => store_error_to_response(store_err, err.to_string()),
        DeliveryError::TrackingAllocationExhausted { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn store_error_to_response(err: &StoreError, message: String) -> (StatusCode, String) {
    match err {
        StoreError::DuplicateOrder(_) | StoreError::DuplicateTracking(_) => {
            (StatusCode::CONFLICT, message)
        }
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, message),
        StoreError::Database(_) | StoreError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

fn stock_error_to_response(err: StockError) -> (StatusCode, String) {
    match &err {
        StockError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StockError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        StockError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        StockError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::Store(store_err) => store_error_to_response(store_err, err.to_string()),
        FulfillmentError::Persistence(_) => {
            tracing::error!(error = %err, "delivery persistence failed after reservation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create delivery due to an internal error".to_string(),
            )
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        ApiError::Delivery(err)
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        ApiError::Stock(err)
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}
