//! Remote stock client.
//!
//! The delivery service never talks to the product service's storage
//! directly; it goes through a [`StockClient`], which translates
//! transport and ledger failures into outcomes the coordinator can
//! reason about. The client is injected into the coordinator at
//! construction, so tests can substitute doubles for the remote ledger.

use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use product::{Money, StockError, StockLedger};
use tokio::time::timeout;

use crate::outcome::{StockFailure, StockReservationResult};

/// Default bound on a single remote call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// The delivery service's view of a remote product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

/// Proxy to the product service's stock ledger.
///
/// `reduce_one` performs exactly one remote mutating call and never
/// retries: reduction is not idempotent, so retrying is a policy
/// decision that belongs to the caller, not this layer.
#[async_trait]
pub trait StockClient: Send + Sync {
    /// Looks up a product. Returns `None` when the product does not
    /// exist or the lookup itself failed.
    async fn fetch(&self, product_id: ProductId) -> Option<ProductView>;

    /// Attempts one stock reduction. Never raises: every failure is
    /// captured in the returned result.
    async fn reduce_one(&self, product_id: ProductId, quantity: u32) -> StockReservationResult;

    /// Restores previously reduced stock (compensation). Returns the
    /// new stock level, or a message describing why the restore failed.
    async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<u32, String>;
}

/// Stock client backed directly by a [`StockLedger`].
///
/// Stands in for the remote transport; every call is bounded by
/// `call_timeout` and a timeout is reported as a transport failure,
/// never as a success.
#[derive(Clone)]
pub struct LedgerStockClient<L: StockLedger> {
    ledger: L,
    call_timeout: Duration,
}

impl<L: StockLedger> LedgerStockClient<L> {
    /// Creates a client with the default call timeout.
    pub fn new(ledger: L) -> Self {
        Self::with_timeout(ledger, DEFAULT_CALL_TIMEOUT)
    }

    /// Creates a client with a custom call timeout.
    pub fn with_timeout(ledger: L, call_timeout: Duration) -> Self {
        Self {
            ledger,
            call_timeout,
        }
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn map_stock_error(error: StockError) -> StockFailure {
        match error {
            StockError::NotFound(_) => StockFailure::NotFound,
            StockError::InsufficientStock {
                name,
                requested,
                available,
            } => StockFailure::InsufficientStock {
                product_name: name,
                requested,
                available,
            },
            StockError::InvalidQuantity(quantity) => StockFailure::InvalidQuantity { quantity },
            StockError::Database(e) => StockFailure::Transport {
                message: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl<L: StockLedger> StockClient for LedgerStockClient<L> {
    async fn fetch(&self, product_id: ProductId) -> Option<ProductView> {
        match timeout(self.call_timeout, self.ledger.get(product_id)).await {
            Ok(Ok(Some(product))) => Some(ProductView {
                id: product.id,
                name: product.name,
                price: product.price,
                stock: product.stock,
            }),
            Ok(Ok(None)) => None,
            Ok(Err(error)) => {
                tracing::warn!(%product_id, %error, "product lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(%product_id, "product lookup timed out");
                None
            }
        }
    }

    async fn reduce_one(&self, product_id: ProductId, quantity: u32) -> StockReservationResult {
        match timeout(self.call_timeout, self.ledger.reduce(product_id, quantity)).await {
            Ok(Ok(product)) => {
                tracing::debug!(%product_id, quantity, remaining = product.stock, "stock reduced");
                StockReservationResult::reduced(product_id, quantity, product.stock)
            }
            Ok(Err(error)) => {
                StockReservationResult::failed(product_id, quantity, Self::map_stock_error(error))
            }
            Err(_) => StockReservationResult::failed(
                product_id,
                quantity,
                StockFailure::Transport {
                    message: "stock service call timed out".to_string(),
                },
            ),
        }
    }

    async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<u32, String> {
        // Read first so the log carries the before/after levels.
        let before = match timeout(self.call_timeout, self.ledger.get(product_id)).await {
            Ok(Ok(Some(product))) => Some(product.stock),
            _ => None,
        };

        match timeout(self.call_timeout, self.ledger.increase(product_id, quantity)).await {
            Ok(Ok(product)) => {
                tracing::info!(
                    %product_id,
                    quantity,
                    ?before,
                    after = product.stock,
                    "stock restored"
                );
                Ok(product.stock)
            }
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err("stock service call timed out".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CategoryId;
    use product::{InMemoryStockLedger, Product};

    async fn seeded(stock: u32) -> (LedgerStockClient<InMemoryStockLedger>, ProductId) {
        let ledger = InMemoryStockLedger::new();
        let product = Product::new(
            "Widget",
            "A widget",
            Money::from_cents(1000),
            stock,
            CategoryId::new(),
        );
        let id = product.id;
        ledger.insert(product).await.unwrap();
        (LedgerStockClient::new(ledger), id)
    }

    #[tokio::test]
    async fn test_fetch_known_product() {
        let (client, id) = seeded(5).await;
        let view = client.fetch(id).await.unwrap();
        assert_eq!(view.id, id);
        assert_eq!(view.name, "Widget");
        assert_eq!(view.stock, 5);
    }

    #[tokio::test]
    async fn test_fetch_unknown_product() {
        let (client, _) = seeded(5).await;
        assert!(client.fetch(ProductId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_reduce_one_success_carries_remaining_stock() {
        let (client, id) = seeded(5).await;
        let result = client.reduce_one(id, 2).await;
        assert!(result.is_success());
        assert_eq!(
            result.outcome,
            crate::outcome::ReservationOutcome::Reduced { remaining_stock: 3 }
        );
    }

    #[tokio::test]
    async fn test_reduce_one_maps_insufficient_stock() {
        let (client, id) = seeded(1).await;
        let result = client.reduce_one(id, 3).await;
        assert_eq!(
            result.failure(),
            Some(&StockFailure::InsufficientStock {
                product_name: "Widget".to_string(),
                requested: 3,
                available: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_reduce_one_maps_not_found_and_invalid_quantity() {
        let (client, id) = seeded(5).await;

        let result = client.reduce_one(ProductId::new(), 1).await;
        assert_eq!(result.failure(), Some(&StockFailure::NotFound));

        let result = client.reduce_one(id, 0).await;
        assert_eq!(
            result.failure(),
            Some(&StockFailure::InvalidQuantity { quantity: 0 })
        );
    }

    #[tokio::test]
    async fn test_restore_returns_new_stock() {
        let (client, id) = seeded(5).await;
        client.reduce_one(id, 4).await;

        let new_stock = client.restore(id, 4).await.unwrap();
        assert_eq!(new_stock, 5);
    }

    #[tokio::test]
    async fn test_restore_unknown_product_reports_message() {
        let (client, _) = seeded(5).await;
        let result = client.restore(ProductId::new(), 1).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not found"));
    }
}
