//! In-memory stock ledger implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::ProductId;
use tokio::sync::RwLock;

use crate::error::{Result, StockError};
use crate::ledger::StockLedger;
use crate::model::Product;

/// In-memory stock ledger for testing and single-process deployments.
///
/// All mutations run inside one write-lock critical section, which gives
/// the same check-and-decrement atomicity the SQL implementation gets
/// from its conditional `UPDATE`.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of products in the catalog.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    /// Returns the current stock level, or `None` for an unknown product.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.products.read().await.get(&product_id).map(|p| p.stock)
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn get(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    async fn reduce(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(StockError::NotFound(product_id))?;

        if product.stock < quantity {
            return Err(StockError::InsufficientStock {
                name: product.name.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        product.updated_at = Utc::now();
        metrics::counter!("stock_reductions_total").increment(1);
        Ok(product.clone())
    }

    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(StockError::NotFound(product_id))?;

        product.stock = product.stock.saturating_add(quantity);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn insert(&self, product: Product) -> Result<Product> {
        let mut products = self.products.write().await;
        products.insert(product.id, product.clone());
        Ok(product)
    }
}
