//! Product catalog model.

use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A product in the catalog.
///
/// Invariants: `price` is non-negative and `stock` can never go below
/// zero. The stock invariant is enforced at the point of decrement by
/// the ledger, not by post-hoc validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,

    /// Human-readable product name.
    pub name: String,

    /// Longer product description.
    pub description: String,

    /// Price per unit.
    pub price: Money,

    /// Units currently in stock.
    pub stock: u32,

    /// Category the product belongs to (owned by a separate service).
    pub category_id: CategoryId,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new product with a generated ID and current timestamps.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: u32,
        category_id: CategoryId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: description.into(),
            price,
            stock,
            category_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if at least one unit is in stock.
    pub fn is_available(&self) -> bool {
        self.stock > 0
    }
}
