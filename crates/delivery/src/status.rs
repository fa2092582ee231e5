//! Delivery status state machine.

use serde::{Deserialize, Serialize};

/// The status of a delivery in its lifecycle.
///
/// Status transitions:
/// ```text
/// pending ──► confirmed ──► packed ──► shipped ──► in_transit ──► out_for_delivery ──► delivered
///    │            │            │          │             │                 │
///    └────────────┴────────────┴──────────┴─────────────┴─────────────────┴──► failed / returned
/// ```
/// Transitions only move forward along the chain (skipping is allowed);
/// `failed` and `returned` are reachable from any non-terminal status.
/// `delivered`, `failed` and `returned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Delivery has been created but not yet confirmed.
    #[default]
    Pending,

    /// Delivery confirmed; a tracking number is allocated on entry.
    Confirmed,

    /// Items have been packed.
    Packed,

    /// Handed over to the carrier; allocates a tracking number if
    /// none exists yet.
    Shipped,

    /// Moving through the carrier network.
    InTransit,

    /// On the last leg to the customer.
    OutForDelivery,

    /// Delivered to the customer (terminal).
    Delivered,

    /// Delivery failed or was cancelled (terminal).
    Failed,

    /// Returned to sender (terminal).
    Returned,
}

impl DeliveryStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [DeliveryStatus; 9] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Confirmed,
        DeliveryStatus::Packed,
        DeliveryStatus::Shipped,
        DeliveryStatus::InTransit,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
        DeliveryStatus::Returned,
    ];

    /// Returns true if this is a terminal status.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Returned
        )
    }

    /// Returns true if the delivery is actively being fulfilled.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Confirmed
                | DeliveryStatus::Packed
                | DeliveryStatus::Shipped
                | DeliveryStatus::InTransit
                | DeliveryStatus::OutForDelivery
        )
    }

    /// Position along the forward progress chain; `None` for the side
    /// branches `failed` and `returned`.
    fn progress_rank(&self) -> Option<u8> {
        match self {
            DeliveryStatus::Pending => Some(0),
            DeliveryStatus::Confirmed => Some(1),
            DeliveryStatus::Packed => Some(2),
            DeliveryStatus::Shipped => Some(3),
            DeliveryStatus::InTransit => Some(4),
            DeliveryStatus::OutForDelivery => Some(5),
            DeliveryStatus::Delivered => Some(6),
            DeliveryStatus::Failed | DeliveryStatus::Returned => None,
        }
    }

    /// Returns true if a transition from this status to `target` is legal.
    ///
    /// Terminal statuses are not re-enterable. Re-asserting the current
    /// status is allowed (it is a metadata update, not a regression).
    pub fn can_transition_to(&self, target: DeliveryStatus) -> bool {
        if self.is_completed() {
            return false;
        }
        match (self.progress_rank(), target.progress_rank()) {
            // failed/returned are reachable from any non-terminal status
            (_, None) => true,
            (Some(from), Some(to)) => to >= from,
            // unreachable: a non-terminal source always has a rank
            (None, Some(_)) => false,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Confirmed => "confirmed",
            DeliveryStatus::Packed => "packed",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "confirmed" => Ok(DeliveryStatus::Confirmed),
            "packed" => Ok(DeliveryStatus::Packed),
            "shipped" => Ok(DeliveryStatus::Shipped),
            "in_transit" => Ok(DeliveryStatus::InTransit),
            "out_for_delivery" => Ok(DeliveryStatus::OutForDelivery),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            "returned" => Ok(DeliveryStatus::Returned),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(DeliveryStatus::default(), DeliveryStatus::Pending);
    }

    #[test]
    fn test_completed_statuses() {
        assert!(DeliveryStatus::Delivered.is_completed());
        assert!(DeliveryStatus::Failed.is_completed());
        assert!(DeliveryStatus::Returned.is_completed());
        assert!(!DeliveryStatus::Pending.is_completed());
        assert!(!DeliveryStatus::OutForDelivery.is_completed());
    }

    #[test]
    fn test_in_progress_statuses() {
        assert!(DeliveryStatus::Confirmed.is_in_progress());
        assert!(DeliveryStatus::Packed.is_in_progress());
        assert!(DeliveryStatus::Shipped.is_in_progress());
        assert!(DeliveryStatus::InTransit.is_in_progress());
        assert!(DeliveryStatus::OutForDelivery.is_in_progress());
        assert!(!DeliveryStatus::Pending.is_in_progress());
        assert!(!DeliveryStatus::Delivered.is_in_progress());
        assert!(!DeliveryStatus::Failed.is_in_progress());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Confirmed));
        assert!(DeliveryStatus::Confirmed.can_transition_to(DeliveryStatus::Packed));
        // Skipping ahead is allowed
        assert!(DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Shipped));
        assert!(DeliveryStatus::Shipped.can_transition_to(DeliveryStatus::Delivered));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!DeliveryStatus::Shipped.can_transition_to(DeliveryStatus::Confirmed));
        assert!(!DeliveryStatus::OutForDelivery.can_transition_to(DeliveryStatus::Pending));
    }

    #[test]
    fn test_same_status_is_allowed() {
        assert!(DeliveryStatus::Confirmed.can_transition_to(DeliveryStatus::Confirmed));
    }

    #[test]
    fn test_terminal_statuses_not_reenterable() {
        for status in DeliveryStatus::ALL {
            assert!(!DeliveryStatus::Delivered.can_transition_to(status));
            assert!(!DeliveryStatus::Failed.can_transition_to(status));
            assert!(!DeliveryStatus::Returned.can_transition_to(status));
        }
    }

    #[test]
    fn test_side_branches_reachable_from_any_non_terminal() {
        for status in DeliveryStatus::ALL {
            if !status.is_completed() {
                assert!(status.can_transition_to(DeliveryStatus::Failed));
                assert!(status.can_transition_to(DeliveryStatus::Returned));
            }
        }
    }

    #[test]
    fn test_display_and_parse_roundtrip() {
        for status in DeliveryStatus::ALL {
            let parsed: DeliveryStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("express".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&DeliveryStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }
}
