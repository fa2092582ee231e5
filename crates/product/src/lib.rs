//! Product service: catalog model and the stock ledger.
//!
//! The stock ledger is the authoritative per-product stock counter. Its
//! one hard guarantee is that `reduce` is a single atomic conditional
//! decrement: a concurrent decrement never drives stock negative, and a
//! failed decrement applies nothing. `increase` exists for the delivery
//! service's compensation path and is an unconditional atomic add.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod model;
pub mod money;
pub mod postgres;

pub use error::{Result, StockError};
pub use ledger::StockLedger;
pub use memory::InMemoryStockLedger;
pub use model::Product;
pub use money::Money;
pub use postgres::PostgresStockLedger;
