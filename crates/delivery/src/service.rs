//! Delivery service: status updates and queries over a delivery store.

use chrono::{DateTime, Utc};
use common::{DeliveryId, OrderId};

use crate::error::{DeliveryError, Result};
use crate::model::Delivery;
use crate::status::DeliveryStatus;
use crate::store::{
    DeliveryFilter, DeliveryPage, DeliveryStats, DeliveryStore, PageRequest, StoreError,
};
use crate::tracking::{MAX_ALLOCATION_ATTEMPTS, generate_tracking_number};
use crate::transition::{TransitionEffect, plan_transition};

/// Command to move a delivery to a new status.
#[derive(Debug, Clone)]
pub struct UpdateStatus {
    /// The delivery to update.
    pub delivery_id: DeliveryId,
    /// The target status.
    pub status: DeliveryStatus,
    /// Replacement notes, if any.
    pub notes: Option<String>,
    /// Updated delivery estimate, if any.
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl UpdateStatus {
    /// Creates a status-update command with no metadata changes.
    pub fn new(delivery_id: DeliveryId, status: DeliveryStatus) -> Self {
        Self {
            delivery_id,
            status,
            notes: None,
            estimated_delivery: None,
        }
    }

    /// Attaches notes to the update.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Service for managing deliveries after creation.
///
/// Status changes go through the pure transition planner; this service
/// applies the planned side effects (tracking allocation, delivery
/// stamping) and persists the result.
pub struct DeliveryService<S: DeliveryStore> {
    store: S,
}

impl<S: DeliveryStore> DeliveryService<S> {
    /// Creates a new delivery service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Moves a delivery to a new status, applying transition side effects.
    #[tracing::instrument(skip(self, cmd), fields(delivery_id = %cmd.delivery_id, status = %cmd.status))]
    pub async fn update_status(&self, cmd: UpdateStatus) -> Result<Delivery> {
        let delivery = self
            .store
            .get(cmd.delivery_id)
            .await?
            .ok_or(DeliveryError::NotFound(cmd.delivery_id))?;

        let plan = plan_transition(&delivery, cmd.status)?;

        let mut updated = delivery;
        updated.status = plan.status;
        if let Some(notes) = cmd.notes {
            updated.notes = Some(notes);
        }
        if let Some(estimated) = cmd.estimated_delivery {
            updated.estimated_delivery = Some(estimated);
        }
        if plan.effects.contains(&TransitionEffect::StampActualDelivery) {
            updated.actual_delivery = Some(Utc::now());
        }
        updated.updated_at = Utc::now();

        let updated = if plan.effects.contains(&TransitionEffect::AllocateTrackingNumber) {
            self.persist_with_new_tracking(updated).await?
        } else {
            self.store.update(&updated).await?;
            updated
        };

        metrics::counter!("delivery_status_updates_total").increment(1);
        Ok(updated)
    }

    /// Cancels a delivery (maps to the `failed` status).
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: DeliveryId, reason: Option<String>) -> Result<Delivery> {
        let notes = reason
            .map(|r| format!("Cancelled: {r}"))
            .unwrap_or_else(|| "Delivery cancelled".to_string());

        self.update_status(UpdateStatus::new(id, DeliveryStatus::Failed).with_notes(notes))
            .await
    }

    /// Marks a delivery as delivered.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        id: DeliveryId,
        notes: Option<String>,
    ) -> Result<Delivery> {
        let mut cmd = UpdateStatus::new(id, DeliveryStatus::Delivered);
        cmd.notes = notes;
        self.update_status(cmd).await
    }

    /// Looks up a delivery by ID.
    pub async fn get(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        Ok(self.store.get(id).await?)
    }

    /// Looks up the delivery for an order.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Delivery>> {
        Ok(self.store.get_by_order(order_id).await?)
    }

    /// Looks up a delivery by tracking number.
    pub async fn get_by_tracking(&self, tracking_number: &str) -> Result<Option<Delivery>> {
        Ok(self.store.get_by_tracking(tracking_number).await?)
    }

    /// Lists deliveries matching a filter, newest first.
    pub async fn list(&self, filter: &DeliveryFilter, page: PageRequest) -> Result<DeliveryPage> {
        Ok(self.store.list(filter, page).await?)
    }

    /// Returns delivery counts by status bucket.
    pub async fn stats(&self) -> Result<DeliveryStats> {
        Ok(self.store.stats().await?)
    }

    /// Allocates a unique tracking number and persists the delivery.
    ///
    /// Collisions (seen either in the pre-check or as a unique-constraint
    /// violation from a racing writer) trigger regeneration, bounded by
    /// `MAX_ALLOCATION_ATTEMPTS`.
    async fn persist_with_new_tracking(&self, mut delivery: Delivery) -> Result<Delivery> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let candidate = generate_tracking_number();

            if self.store.get_by_tracking(&candidate).await?.is_some() {
                tracing::debug!(attempt, %candidate, "tracking number collision, regenerating");
                continue;
            }

            delivery.tracking_number = Some(candidate);
            match self.store.update(&delivery).await {
                Ok(()) => {
                    tracing::info!(
                        delivery_id = %delivery.id,
                        tracking_number = delivery.tracking_number.as_deref().unwrap_or(""),
                        "tracking number allocated"
                    );
                    return Ok(delivery);
                }
                // Lost the race against a concurrent allocation.
                Err(StoreError::DuplicateTracking(_)) => {
                    delivery.tracking_number = None;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DeliveryError::TrackingAllocationExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }
}
