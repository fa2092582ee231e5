//! Shared types for the delivery and product services.
//!
//! Each service owns its own entities; the identifiers that cross the
//! service boundary live here so neither crate depends on the other
//! just to name a foreign key.

pub mod types;

pub use types::{CategoryId, DeliveryId, OrderId, ProductId};
