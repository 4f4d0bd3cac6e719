//! Operator-facing fulfillment lifecycle.
//!
//! The graph is strictly forward with one lateral escape:
//! `Pending → Processing → Shipped → Delivered`, and `Cancelled` reachable
//! from any non-terminal state. No skipping. Invalid transitions are rejected
//! with the specific violated rule so the operator console can surface why.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{FulfillmentStatus, OrderRecord},
    services::orders::OrderService,
};

#[derive(Clone)]
pub struct OrderLifecycleService {
    orders: OrderService,
    event_sender: EventSender,
}

impl OrderLifecycleService {
    pub fn new(orders: OrderService, event_sender: EventSender) -> Self {
        Self {
            orders,
            event_sender,
        }
    }

    /// Advances an order's fulfillment status, validating the transition.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: FulfillmentStatus,
    ) -> Result<OrderRecord, ServiceError> {
        let current = self.orders.get_record(order_id)?.fulfillment_status;

        if let Err(rule) = validate_transition(current, new_status) {
            warn!(
                "Rejected fulfillment transition {} -> {} for order {}: {}",
                current, new_status, order_id, rule
            );
            return Err(ServiceError::InvalidStatus(rule));
        }

        let updated = self.orders.set_fulfillment_status(order_id, new_status)?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: current.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        info!(
            "Order {} fulfillment moved from {} to {}",
            order_id, current, new_status
        );
        Ok(updated)
    }

    pub fn get_status(&self, order_id: Uuid) -> Result<FulfillmentStatus, ServiceError> {
        Ok(self.orders.get_record(order_id)?.fulfillment_status)
    }
}

/// Checks one edge of the fulfillment graph, naming the violated rule on
/// rejection.
pub fn validate_transition(
    from: FulfillmentStatus,
    to: FulfillmentStatus,
) -> Result<(), String> {
    use FulfillmentStatus::*;

    if from == to {
        return Err(format!("order is already {}", from));
    }

    if from.is_terminal() {
        return Err(format!("{} is a terminal state", from));
    }

    let allowed = match (from, to) {
        (Pending, Processing) => true,
        (Processing, Shipped) => true,
        (Shipped, Delivered) => true,
        (_, Cancelled) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(format!(
            "cannot move from {} to {}: fulfillment advances one step at a time",
            from, to
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FulfillmentStatus::*;

    #[test]
    fn forward_path_is_accepted_one_step_at_a_time() {
        assert!(validate_transition(Pending, Processing).is_ok());
        assert!(validate_transition(Processing, Shipped).is_ok());
        assert!(validate_transition(Shipped, Delivered).is_ok());
    }

    #[test]
    fn skipping_is_rejected_with_rule() {
        let err = validate_transition(Pending, Delivered).expect_err("must reject");
        assert!(err.contains("one step at a time"), "rule missing: {}", err);
        assert!(validate_transition(Pending, Shipped).is_err());
        assert!(validate_transition(Processing, Delivered).is_err());
    }

    #[test]
    fn cancel_is_reachable_from_any_non_terminal_state() {
        assert!(validate_transition(Pending, Cancelled).is_ok());
        assert!(validate_transition(Processing, Cancelled).is_ok());
        assert!(validate_transition(Shipped, Cancelled).is_ok());
    }

    #[test]
    fn terminal_states_refuse_everything() {
        for to in [Pending, Processing, Shipped, Cancelled] {
            let err = validate_transition(Delivered, to).expect_err("terminal");
            assert!(err.contains("terminal"));
        }
        assert!(validate_transition(Cancelled, Processing).is_err());
    }

    #[test]
    fn backwards_moves_are_rejected() {
        assert!(validate_transition(Shipped, Processing).is_err());
        assert!(validate_transition(Processing, Pending).is_err());
    }
}
