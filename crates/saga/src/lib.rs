//! Stock-reservation saga for order fulfillment.
//!
//! Creating a delivery must atomically reserve stock across one or more
//! products owned by a separate service. There is no shared transaction
//! across that boundary, so coordination is a saga: reserve per item,
//! and compensate already-applied reductions when anything fails.
//!
//! Two strategies are implemented:
//! 1. Optimistic: reduce every item, unwind the successes on failure.
//! 2. Validate-first: read-only pre-flight over every item, mutate only
//!    when all pass, unwind if a reduction still loses a race.
//!
//! The delivery-creation entry point uses validate-first.

pub mod client;
pub mod coordinator;
pub mod error;
pub mod fulfillment;
pub mod outcome;

pub use client::{DEFAULT_CALL_TIMEOUT, LedgerStockClient, ProductView, StockClient};
pub use coordinator::SagaCoordinator;
pub use error::FulfillmentError;
pub use fulfillment::{CreateDelivery, CreationOutcome, FulfillmentService, StockErrorDetail};
pub use outcome::{
    AppliedReduction, ReservationOutcome, ReservationStrategy, SagaOutcome, StockFailure,
    StockReservationResult,
};
