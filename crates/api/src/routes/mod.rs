//! HTTP route handlers.

pub mod deliveries;
pub mod health;
pub mod metrics;
pub mod products;
