//! Delivery record and line items.

use chrono::{DateTime, Utc};
use common::{DeliveryId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::status::DeliveryStatus;

/// One (product, quantity) pair within an order's reservation request.
///
/// Stored in minimal form: product name and price are owned by the
/// product service and fetched live on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product to deliver.
    pub product_id: ProductId,
    /// Units ordered. Always positive for a persisted delivery.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Parameters for creating a delivery.
#[derive(Debug, Clone)]
pub struct NewDelivery {
    /// The order this delivery fulfills (unique across deliveries).
    pub order_id: OrderId,
    /// Destination address.
    pub delivery_address: String,
    /// Customer name, if known.
    pub customer_name: Option<String>,
    /// Customer phone, if known.
    pub customer_phone: Option<String>,
    /// Ordered line items, in caller-supplied order.
    pub items: Vec<LineItem>,
    /// Estimated delivery time, if known.
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// A delivery record.
///
/// Created only as the terminal step of a successful stock-reservation
/// saga; afterwards mutated exclusively through status updates. Never
/// hard-deleted: cancellation is a transition to `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Unique delivery identifier.
    pub id: DeliveryId,

    /// The order this delivery fulfills.
    pub order_id: OrderId,

    /// Current status.
    pub status: DeliveryStatus,

    /// Destination address.
    pub delivery_address: String,

    /// Customer name, if known.
    pub customer_name: Option<String>,

    /// Customer phone, if known.
    pub customer_phone: Option<String>,

    /// Globally unique tracking number; allocated on the first
    /// transition to `confirmed` or `shipped` and immutable afterwards.
    pub tracking_number: Option<String>,

    /// Estimated delivery time, if known.
    pub estimated_delivery: Option<DateTime<Utc>>,

    /// When the delivery actually happened; stamped on the first
    /// transition to `delivered`.
    pub actual_delivery: Option<DateTime<Utc>>,

    /// Free-form notes, updated alongside status changes.
    pub notes: Option<String>,

    /// Ordered line items in minimal form.
    pub items: Vec<LineItem>,

    /// When the delivery was created.
    pub created_at: DateTime<Utc>,

    /// When the delivery was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Creates a new pending delivery with a generated ID.
    pub fn create(new: NewDelivery) -> Self {
        let now = Utc::now();
        Self {
            id: DeliveryId::new(),
            order_id: new.order_id,
            status: DeliveryStatus::Pending,
            delivery_address: new.delivery_address,
            customer_name: new.customer_name,
            customer_phone: new.customer_phone,
            tracking_number: None,
            estimated_delivery: new.estimated_delivery,
            actual_delivery: None,
            notes: None,
            items: new.items,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the delivery reached a terminal status.
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Returns true if the delivery is actively being fulfilled.
    pub fn is_in_progress(&self) -> bool {
        self.status.is_in_progress()
    }

    /// Total units across all line items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
