//! Fulfillment error types.

use delivery::StoreError;
use thiserror::Error;

/// Errors that can occur while creating a delivery.
///
/// Per-item stock failures are not errors at this level; they are
/// aggregated into the structured [`CreationOutcome::Rejected`]
/// result. Only genuinely unexpected conditions surface here.
///
/// [`CreationOutcome::Rejected`]: crate::fulfillment::CreationOutcome
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The delivery store failed before any stock was reserved.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The local delivery write failed after remote stock was already
    /// reserved. Compensation has been attempted by the time this
    /// surfaces.
    #[error("Failed to persist delivery after stock was reserved: {0}")]
    Persistence(StoreError),
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
