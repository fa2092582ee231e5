//! Delivery store trait and query types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{DeliveryId, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Delivery;
use crate::status::DeliveryStatus;

/// Errors surfaced by a delivery store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A delivery already exists for the order.
    #[error("A delivery already exists for order {0}")]
    DuplicateOrder(OrderId),

    /// The tracking number is already in use by another delivery.
    #[error("Tracking number '{0}' is already in use")]
    DuplicateTracking(String),

    /// No delivery with the given ID.
    #[error("Delivery {0} not found")]
    NotFound(DeliveryId),

    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Filter for listing deliveries. All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    /// Only deliveries in this status.
    pub status: Option<DeliveryStatus>,
    /// Case-insensitive substring match on the customer name.
    pub customer_name: Option<String>,
    /// Only deliveries created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,
    /// Only deliveries created at or before this instant.
    pub created_to: Option<DateTime<Utc>>,
}

/// A page request. Pages are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageRequest {
    /// Creates a page request, clamping page to at least 1 and limit to
    /// at least 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Pagination metadata returned with a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageInfo {
    /// Computes pagination metadata for a page request and a total count.
    pub fn calculate(page: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(page.limit)) as u32;
        Self {
            current_page: page.page,
            total_pages,
            total_items,
            has_next_page: page.page < total_pages,
            has_previous_page: page.page > 1,
        }
    }
}

/// One page of deliveries, newest first.
#[derive(Debug, Clone)]
pub struct DeliveryPage {
    pub deliveries: Vec<Delivery>,
    pub pagination: PageInfo,
}

/// Counts of deliveries by status bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    /// All deliveries.
    pub total: u64,
    /// Deliveries still pending.
    pub pending: u64,
    /// Confirmed through out-for-delivery.
    pub in_progress: u64,
    /// Delivered.
    pub completed: u64,
    /// Failed or returned.
    pub failed: u64,
}

/// Transactional storage for delivery records.
///
/// Implementations enforce two unique constraints: at most one delivery
/// per `order_id`, and globally unique tracking numbers. Violations are
/// reported as `DuplicateOrder` / `DuplicateTracking` so callers can
/// react (idempotency guard, tracking-allocation retry).
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Inserts a new delivery.
    async fn insert(&self, delivery: &Delivery) -> Result<(), StoreError>;

    /// Updates an existing delivery in full.
    async fn update(&self, delivery: &Delivery) -> Result<(), StoreError>;

    /// Looks up a delivery by ID.
    async fn get(&self, id: DeliveryId) -> Result<Option<Delivery>, StoreError>;

    /// Looks up the delivery for an order, if one exists.
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Delivery>, StoreError>;

    /// Looks up a delivery by tracking number.
    async fn get_by_tracking(&self, tracking_number: &str)
    -> Result<Option<Delivery>, StoreError>;

    /// Lists deliveries matching `filter`, newest first, paginated.
    async fn list(
        &self,
        filter: &DeliveryFilter,
        page: PageRequest,
    ) -> Result<DeliveryPage, StoreError>;

    /// Returns counts by status bucket.
    async fn stats(&self) -> Result<DeliveryStats, StoreError>;
}
