//! Reservation result types.
//!
//! Per-item failures are aggregated, never thrown individually: the
//! caller always receives the complete picture across all line items.

use common::ProductId;

/// Why one line item could not be reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockFailure {
    /// The product does not exist.
    NotFound,

    /// Fewer units available than requested.
    InsufficientStock {
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The reservation amount is not a positive number.
    InvalidQuantity { quantity: u32 },

    /// The remote call failed for reasons opaque to this layer
    /// (including timeouts).
    Transport { message: String },

    /// The item itself was fine but another item in the order failed
    /// pre-flight, so nothing was reserved.
    Aborted,
}

impl StockFailure {
    /// The stock level known to be available, where the failure carries one.
    pub fn available_stock(&self) -> Option<u32> {
        match self {
            StockFailure::InsufficientStock { available, .. } => Some(*available),
            _ => None,
        }
    }

    /// The product name, where the failure carries one.
    pub fn product_name(&self) -> Option<&str> {
        match self {
            StockFailure::InsufficientStock { product_name, .. } => Some(product_name),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockFailure::NotFound => write!(f, "Product not found"),
            StockFailure::InsufficientStock {
                product_name,
                requested,
                available,
            } => write!(
                f,
                "Insufficient stock for product '{product_name}'. \
                 Requested: {requested}, Available: {available}"
            ),
            StockFailure::InvalidQuantity { quantity } => write!(
                f,
                "Invalid quantity: {quantity}. Quantity must be a positive number"
            ),
            StockFailure::Transport { message } => {
                write!(f, "Stock service call failed: {message}")
            }
            StockFailure::Aborted => write!(f, "Cancelled due to other item failures"),
        }
    }
}

/// What happened to one line item's reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// Stock was reduced; `remaining_stock` is the level afterwards.
    Reduced { remaining_stock: u32 },
    /// Nothing was reserved for this item.
    Failed(StockFailure),
}

/// The outcome of one line item's reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservationResult {
    /// The product the attempt was for.
    pub product_id: ProductId,
    /// Units requested.
    pub quantity: u32,
    /// What happened.
    pub outcome: ReservationOutcome,
}

impl StockReservationResult {
    /// A successful reduction.
    pub fn reduced(product_id: ProductId, quantity: u32, remaining_stock: u32) -> Self {
        Self {
            product_id,
            quantity,
            outcome: ReservationOutcome::Reduced { remaining_stock },
        }
    }

    /// A failed reservation.
    pub fn failed(product_id: ProductId, quantity: u32, failure: StockFailure) -> Self {
        Self {
            product_id,
            quantity,
            outcome: ReservationOutcome::Failed(failure),
        }
    }

    /// Returns true if the reduction was applied.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ReservationOutcome::Reduced { .. })
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&StockFailure> {
        match &self.outcome {
            ReservationOutcome::Failed(failure) => Some(failure),
            ReservationOutcome::Reduced { .. } => None,
        }
    }
}

/// A stock reduction that was actually applied and may need compensating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedReduction {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Aggregate outcome of a reservation saga.
///
/// On failure the coordinator has already compensated, so `reductions`
/// is empty; on success it lists every applied reduction so the caller
/// can compensate if its own follow-up work fails.
#[derive(Debug, Clone)]
pub struct SagaOutcome {
    /// Per-item results, in caller-supplied item order.
    pub results: Vec<StockReservationResult>,
    /// Reductions still standing (empty after a failed saga).
    pub reductions: Vec<AppliedReduction>,
}

impl SagaOutcome {
    /// Returns true if every line item was reserved.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(StockReservationResult::is_success)
    }

    /// Iterates over the results that failed.
    pub fn failed_results(&self) -> impl Iterator<Item = &StockReservationResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Number of failed line items.
    pub fn failed_count(&self) -> usize {
        self.failed_results().count()
    }
}

/// How the coordinator sequences validation and mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStrategy {
    /// Reduce every item up front, compensating the successful
    /// reductions if any item fails.
    Optimistic,
    /// Validate every item read-only first; mutate only when all items
    /// pass, compensating if a reduction still loses a race.
    ValidateFirst,
}

impl std::fmt::Display for ReservationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationStrategy::Optimistic => write!(f, "optimistic"),
            ReservationStrategy::ValidateFirst => write!(f, "validate_first"),
        }
    }
}
