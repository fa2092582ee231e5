//! Stock ledger error types.

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during stock ledger operations.
#[derive(Debug, Error)]
pub enum StockError {
    /// Product does not exist.
    #[error("Product with ID '{0}' not found")]
    NotFound(ProductId),

    /// Requested more units than are in stock.
    #[error(
        "Insufficient stock for product '{name}'. Requested: {requested}, Available: {available}"
    )]
    InsufficientStock {
        name: String,
        requested: u32,
        available: u32,
    },

    /// Reservation amount is not a positive number.
    #[error("Invalid quantity: {0}. Quantity must be a positive number")]
    InvalidQuantity(u32),

    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, StockError>;
