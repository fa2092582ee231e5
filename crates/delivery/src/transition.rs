//! Pure status-transition planning.
//!
//! A transition is planned without touching storage: the planner checks
//! legality and names the side effects the caller must apply before
//! persisting. This keeps the state machine testable in isolation from
//! the store.

use crate::error::DeliveryError;
use crate::model::Delivery;
use crate::status::DeliveryStatus;

/// A side effect the caller must apply as part of a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Allocate a unique tracking number (first `confirmed`/`shipped`).
    AllocateTrackingNumber,
    /// Stamp `actual_delivery` with the current time (first `delivered`).
    StampActualDelivery,
}

/// The result of planning a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// The status the delivery will move to.
    pub status: DeliveryStatus,
    /// Effects to apply before persisting.
    pub effects: Vec<TransitionEffect>,
}

/// Plans a transition of `delivery` to `target`.
///
/// Fails with `InvalidStatusTransition` if the move is illegal (leaving
/// a terminal status, or going backwards along the progress chain).
pub fn plan_transition(
    delivery: &Delivery,
    target: DeliveryStatus,
) -> Result<TransitionPlan, DeliveryError> {
    if !delivery.status.can_transition_to(target) {
        return Err(DeliveryError::InvalidStatusTransition {
            from: delivery.status,
            to: target,
        });
    }

    let mut effects = Vec::new();

    if matches!(
        target,
        DeliveryStatus::Confirmed | DeliveryStatus::Shipped
    ) && delivery.tracking_number.is_none()
    {
        effects.push(TransitionEffect::AllocateTrackingNumber);
    }

    if target == DeliveryStatus::Delivered && delivery.actual_delivery.is_none() {
        effects.push(TransitionEffect::StampActualDelivery);
    }

    Ok(TransitionPlan {
        status: target,
        effects,
    })
}
