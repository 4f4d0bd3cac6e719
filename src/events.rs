//! Domain events published by the checkout pipeline.
//!
//! Event delivery is best-effort: subscribers (cart preview panels, the
//! operator dashboard) react to notifications, but no correctness invariant
//! rides on them. Failed sends are logged and dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CartItemAdded {
        session_id: Uuid,
        product_id: Uuid,
    },
    CartItemRemoved {
        session_id: Uuid,
        product_id: Uuid,
    },
    CartQuantityChanged {
        session_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    CartCleared(Uuid),
    CheckoutStarted(Uuid),
    OrderInitiated {
        session_id: Uuid,
        order_id: Uuid,
    },
    CheckoutFailed {
        session_id: Uuid,
        reason: String,
    },
    OrderPaid(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when no receiver is alive.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Builds a channel pair with a reasonable buffer for a single-process app.
pub fn channel() -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(1024);
    (EventSender::new(tx), rx)
}

/// Drains the event queue, logging each event. Spawned from `main`.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPaid(order_id) => info!("Order paid: {}", order_id),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(
                "Order {} status changed from '{}' to '{}'",
                order_id, old_status, new_status
            ),
            other => debug!("Event: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = channel();
        let session_id = Uuid::new_v4();
        sender.send_or_log(Event::CartCleared(session_id)).await;
        match rx.recv().await {
            Some(Event::CartCleared(id)) => assert_eq!(id, session_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_survives_closed_receiver() {
        let (sender, rx) = channel();
        drop(rx);
        // Must not panic or error out.
        sender.send_or_log(Event::CheckoutStarted(Uuid::new_v4())).await;
    }
}
