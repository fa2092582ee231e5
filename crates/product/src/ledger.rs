//! Stock ledger trait.

use async_trait::async_trait;
use common::ProductId;

use crate::error::Result;
use crate::model::Product;

/// Authoritative per-product stock counter.
///
/// `reduce` must be atomic: the decrement either fully applies or not at
/// all, and concurrent reductions on the same product never drive stock
/// negative. `increase` is an unconditional atomic add used by the
/// delivery service to compensate a previously applied reduction; it is
/// not idempotent, so callers must issue it at most once per successful
/// reduction.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Looks up a product. Returns `None` if it does not exist.
    async fn get(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Atomically decrements stock by `quantity`.
    ///
    /// Fails with `InvalidQuantity` for a zero quantity, `NotFound` for
    /// an unknown product, and `InsufficientStock` when fewer than
    /// `quantity` units are available. Returns the updated product.
    async fn reduce(&self, product_id: ProductId, quantity: u32) -> Result<Product>;

    /// Atomically increments stock by `quantity`. Returns the updated product.
    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<Product>;

    /// Adds a new product to the catalog. Returns the stored product.
    async fn insert(&self, product: Product) -> Result<Product>;
}
