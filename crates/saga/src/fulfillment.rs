//! Delivery-creation entry point.
//!
//! Ties the reservation saga to the local delivery record: a delivery
//! is persisted only after every line item's stock was reserved, and a
//! failed local write unwinds the remote reservations before surfacing.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use delivery::{Delivery, DeliveryStore, LineItem, NewDelivery, StoreError};
use serde::Serialize;

use crate::client::StockClient;
use crate::coordinator::SagaCoordinator;
use crate::error::{FulfillmentError, Result};
use crate::outcome::{ReservationStrategy, SagaOutcome};

const DUPLICATE_ORDER_MESSAGE: &str = "Delivery already exists for this order";

/// Command to create a delivery for an order.
#[derive(Debug, Clone)]
pub struct CreateDelivery {
    /// The order to fulfill.
    pub order_id: OrderId,
    /// Destination address.
    pub delivery_address: String,
    /// Customer name, if known.
    pub customer_name: Option<String>,
    /// Customer phone, if known.
    pub customer_phone: Option<String>,
    /// Line items to reserve, in order.
    pub items: Vec<LineItem>,
    /// Estimated delivery time, if known.
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl CreateDelivery {
    /// Creates a command with only the required fields.
    pub fn new(
        order_id: OrderId,
        delivery_address: impl Into<String>,
        items: Vec<LineItem>,
    ) -> Self {
        Self {
            order_id,
            delivery_address: delivery_address.into(),
            customer_name: None,
            customer_phone: None,
            items,
            estimated_delivery: None,
        }
    }
}

/// One line item's stock problem, shaped for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct StockErrorDetail {
    /// The product that could not be reserved.
    pub product_id: ProductId,
    /// Product name, when it could be resolved.
    pub product_name: Option<String>,
    /// Units requested.
    pub requested_quantity: u32,
    /// Units known to be available, when the failure carries the level.
    pub available_stock: Option<u32>,
    /// Human-readable reason.
    pub message: String,
}

/// The result of a delivery-creation attempt.
///
/// Stock problems and duplicate orders are structured rejections, not
/// faults; only unexpected internal conditions become errors.
#[derive(Debug)]
pub enum CreationOutcome {
    /// The saga succeeded and the delivery was persisted.
    Created(Delivery),
    /// Nothing was persisted and no stock remains reserved.
    Rejected {
        stock_errors: Vec<StockErrorDetail>,
        message: String,
    },
}

impl CreationOutcome {
    /// Returns true if a delivery was created.
    pub fn is_success(&self) -> bool {
        matches!(self, CreationOutcome::Created(_))
    }

    /// Returns the created delivery, if any.
    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            CreationOutcome::Created(delivery) => Some(delivery),
            CreationOutcome::Rejected { .. } => None,
        }
    }
}

/// Creates deliveries by running the reservation saga and persisting
/// the resulting record.
pub struct FulfillmentService<S: DeliveryStore, C: StockClient> {
    store: S,
    coordinator: SagaCoordinator<C>,
}

impl<S: DeliveryStore, C: StockClient> FulfillmentService<S, C> {
    /// Creates a new fulfillment service.
    pub fn new(store: S, client: C) -> Self {
        Self {
            store,
            coordinator: SagaCoordinator::new(client),
        }
    }

    /// Returns a reference to the saga coordinator.
    pub fn coordinator(&self) -> &SagaCoordinator<C> {
        &self.coordinator
    }

    /// Creates a delivery for an order, reserving stock first.
    ///
    /// Idempotency guard: if a delivery already exists for the order,
    /// the call is rejected before any reservation is attempted.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, items = cmd.items.len()))]
    pub async fn create_delivery(&self, cmd: CreateDelivery) -> Result<CreationOutcome> {
        if self.store.get_by_order(cmd.order_id).await?.is_some() {
            tracing::info!("delivery already exists for order, rejecting");
            return Ok(CreationOutcome::Rejected {
                stock_errors: Vec::new(),
                message: DUPLICATE_ORDER_MESSAGE.to_string(),
            });
        }

        let outcome = self
            .coordinator
            .reserve(&cmd.items, ReservationStrategy::ValidateFirst)
            .await;

        if !outcome.is_success() {
            let stock_errors = self.build_stock_errors(&outcome).await;
            let failed = outcome.failed_count();
            return Ok(CreationOutcome::Rejected {
                stock_errors,
                message: format!(
                    "Unable to process order. {failed} items have insufficient stock or are unavailable."
                ),
            });
        }

        let delivery = Delivery::create(NewDelivery {
            order_id: cmd.order_id,
            delivery_address: cmd.delivery_address,
            customer_name: cmd.customer_name,
            customer_phone: cmd.customer_phone,
            items: cmd.items,
            estimated_delivery: cmd.estimated_delivery,
        });

        if let Err(e) = self.store.insert(&delivery).await {
            // Reserved stock must not leak when the local write fails.
            tracing::error!(error = %e, "delivery insert failed after reservation, compensating");
            self.coordinator.compensate(&outcome.reductions).await;
            return match e {
                StoreError::DuplicateOrder(_) => Ok(CreationOutcome::Rejected {
                    stock_errors: Vec::new(),
                    message: DUPLICATE_ORDER_MESSAGE.to_string(),
                }),
                other => Err(FulfillmentError::Persistence(other)),
            };
        }

        metrics::counter!("deliveries_created_total").increment(1);
        tracing::info!(delivery_id = %delivery.id, "delivery created and stock reserved");
        Ok(CreationOutcome::Created(delivery))
    }

    /// Shapes the failed results into caller-facing stock errors,
    /// resolving product names where possible.
    async fn build_stock_errors(&self, outcome: &SagaOutcome) -> Vec<StockErrorDetail> {
        let mut errors = Vec::new();
        for result in outcome.failed_results() {
            let Some(failure) = result.failure() else {
                continue;
            };

            let product_name = match failure.product_name() {
                Some(name) => Some(name.to_string()),
                None => self
                    .coordinator
                    .client()
                    .fetch(result.product_id)
                    .await
                    .map(|view| view.name),
            };

            errors.push(StockErrorDetail {
                product_id: result.product_id,
                product_name,
                requested_quantity: result.quantity,
                available_stock: failure.available_stock(),
                message: failure.to_string(),
            });
        }
        errors
    }
}
