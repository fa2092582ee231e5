//! Delivery service error types.

use common::DeliveryId;
use thiserror::Error;

use crate::status::DeliveryStatus;
use crate::store::StoreError;

/// Errors that can occur during delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No delivery with the given ID.
    #[error("Delivery {0} not found")]
    NotFound(DeliveryId),

    /// The requested status change is illegal.
    #[error("Cannot change delivery status from {from} to {to}")]
    InvalidStatusTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// Tracking-number allocation kept colliding.
    #[error("Unable to generate a unique tracking number after {attempts} attempts")]
    TrackingAllocationExhausted { attempts: u32 },

    /// Underlying store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for delivery results.
pub type Result<T> = std::result::Result<T, DeliveryError>;
