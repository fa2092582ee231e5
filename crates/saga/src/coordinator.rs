//! Saga coordinator for cross-service stock reservation.
//!
//! One order's line items are reserved against the remote stock ledger
//! with no shared transaction; consistency comes from the ledger's
//! atomic conditional decrement plus compensating increases on partial
//! failure. Line items are processed sequentially in caller-supplied
//! order, which also fixes compensation order and which errors surface
//! (all of them — per-item failures are aggregated, never short-circuited).

use delivery::LineItem;

use crate::client::StockClient;
use crate::outcome::{
    AppliedReduction, ReservationStrategy, SagaOutcome, StockFailure, StockReservationResult,
};

/// Orchestrates validate/reduce/compensate across one order's line items.
pub struct SagaCoordinator<C: StockClient> {
    client: C,
}

impl<C: StockClient> SagaCoordinator<C> {
    /// Creates a new coordinator over the given stock client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns a reference to the stock client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs a reservation saga over `items` with the chosen strategy.
    ///
    /// On failure the coordinator has already compensated every applied
    /// reduction, so the returned outcome carries no standing reductions.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len(), %strategy))]
    pub async fn reserve(
        &self,
        items: &[LineItem],
        strategy: ReservationStrategy,
    ) -> SagaOutcome {
        metrics::counter!("stock_saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let outcome = match strategy {
            ReservationStrategy::Optimistic => self.reserve_optimistic(items).await,
            ReservationStrategy::ValidateFirst => self.reserve_validate_first(items).await,
        };

        metrics::histogram!("stock_saga_duration_seconds")
            .record(saga_start.elapsed().as_secs_f64());
        if outcome.is_success() {
            metrics::counter!("stock_saga_completed").increment(1);
            tracing::info!(items = items.len(), "stock reservation completed");
        } else {
            metrics::counter!("stock_saga_failed").increment(1);
            tracing::warn!(failed = outcome.failed_count(), "stock reservation failed");
        }

        outcome
    }

    /// Reduce every item up front, then unwind on failure.
    async fn reserve_optimistic(&self, items: &[LineItem]) -> SagaOutcome {
        let (results, reductions) = self.reduce_all(items).await;

        if results.iter().all(StockReservationResult::is_success) {
            return SagaOutcome {
                results,
                reductions,
            };
        }

        self.compensate(&reductions).await;
        SagaOutcome {
            results,
            reductions: Vec::new(),
        }
    }

    /// Read-only pre-flight over every item, then reduce.
    ///
    /// A pre-flight failure aborts with zero mutations. A reduction that
    /// fails despite passing pre-flight (a race with a concurrent
    /// reducer) is unwound the same way the optimistic path unwinds.
    async fn reserve_validate_first(&self, items: &[LineItem]) -> SagaOutcome {
        let mut failures: Vec<Option<StockFailure>> = Vec::with_capacity(items.len());
        for item in items {
            failures.push(self.preflight_one(item).await);
        }

        if failures.iter().any(Option::is_some) {
            // Failing items keep their specific reason; the rest are
            // marked cancelled. Nothing was mutated.
            let results = items
                .iter()
                .zip(failures)
                .map(|(item, failure)| {
                    StockReservationResult::failed(
                        item.product_id,
                        item.quantity,
                        failure.unwrap_or(StockFailure::Aborted),
                    )
                })
                .collect();
            return SagaOutcome {
                results,
                reductions: Vec::new(),
            };
        }

        let (results, reductions) = self.reduce_all(items).await;

        if results.iter().all(StockReservationResult::is_success) {
            return SagaOutcome {
                results,
                reductions,
            };
        }

        tracing::warn!("reduction failed after successful pre-flight, compensating");
        self.compensate(&reductions).await;
        SagaOutcome {
            results,
            reductions: Vec::new(),
        }
    }

    /// Read-only check of one line item. Returns the failure, if any.
    async fn preflight_one(&self, item: &LineItem) -> Option<StockFailure> {
        if item.quantity == 0 {
            return Some(StockFailure::InvalidQuantity {
                quantity: item.quantity,
            });
        }
        match self.client.fetch(item.product_id).await {
            None => Some(StockFailure::NotFound),
            Some(view) if view.stock < item.quantity => Some(StockFailure::InsufficientStock {
                product_name: view.name,
                requested: item.quantity,
                available: view.stock,
            }),
            Some(_) => None,
        }
    }

    /// Reduces every item in order, collecting results and the
    /// reductions that actually applied.
    async fn reduce_all(
        &self,
        items: &[LineItem],
    ) -> (Vec<StockReservationResult>, Vec<AppliedReduction>) {
        let mut results = Vec::with_capacity(items.len());
        let mut reductions = Vec::new();

        for item in items {
            let result = self.client.reduce_one(item.product_id, item.quantity).await;
            if result.is_success() {
                reductions.push(AppliedReduction {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
            results.push(result);
        }

        (results, reductions)
    }

    /// Restores every applied reduction, at most once each.
    ///
    /// Best-effort: a failed restore is logged and swallowed, since the
    /// overall operation has already failed and the original reason must
    /// not be masked.
    #[tracing::instrument(skip(self, reductions), fields(count = reductions.len()))]
    pub async fn compensate(&self, reductions: &[AppliedReduction]) {
        for reduction in reductions {
            match self
                .client
                .restore(reduction.product_id, reduction.quantity)
                .await
            {
                Ok(new_stock) => {
                    tracing::info!(
                        product_id = %reduction.product_id,
                        quantity = reduction.quantity,
                        new_stock,
                        "compensated stock reduction"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        product_id = %reduction.product_id,
                        quantity = reduction.quantity,
                        %error,
                        "failed to compensate stock reduction"
                    );
                }
            }
        }

        if !reductions.is_empty() {
            metrics::counter!("stock_saga_compensations_total").increment(1);
        }
    }
}
