//! Server-issued orders and the operator-side order book.
//!
//! A `ServerOrder` exists from initiation; its payment status is the single
//! source of truth for "is this paid". An `OrderRecord` is created only when
//! a server order transitions to `Paid` and is thereafter mutated only by
//! operator action. Records are never deleted.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        CartLine, FulfillmentStatus, OrderRecord, PaymentStatus, ServerOrder, ShippingAddress,
    },
};

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<DashMap<Uuid, ServerOrder>>,
    records: Arc<DashMap<Uuid, OrderRecord>>,
    event_sender: EventSender,
}

pub struct NewOrder {
    pub customer: String,
    pub customer_email: String,
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub amount: Decimal,
    pub currency: String,
    pub gateway_order_id: String,
}

impl OrderService {
    pub fn new(event_sender: EventSender) -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            records: Arc::new(DashMap::new()),
            event_sender,
        }
    }

    /// Reserves a server order in `AwaitingPayment`. No charge exists yet.
    #[instrument(skip(self, input), fields(customer = %input.customer))]
    pub async fn create(&self, input: NewOrder) -> ServerOrder {
        let order = ServerOrder {
            id: Uuid::new_v4(),
            gateway_order_id: input.gateway_order_id,
            amount: input.amount,
            currency: input.currency,
            status: PaymentStatus::AwaitingPayment,
            customer: input.customer,
            customer_email: input.customer_email,
            items: input.items,
            shipping_address: input.shipping_address,
            created_at: Utc::now(),
        };
        self.orders.insert(order.id, order.clone());
        info!("Server order {} reserved, awaiting payment", order.id);
        order
    }

    pub fn get(&self, order_id: Uuid) -> Result<ServerOrder, ServiceError> {
        self.orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Flips a server order to `Paid` and opens its operator-side record.
    /// Idempotent by order id: marking an already-paid order again is a no-op,
    /// which makes verification retries safe.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: Uuid) -> Result<ServerOrder, ServiceError> {
        let order = {
            let mut entry = self
                .orders
                .get_mut(&order_id)
                .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
            if entry.status != PaymentStatus::Paid {
                entry.status = PaymentStatus::Paid;
            }
            entry.clone()
        };

        let now = Utc::now();
        self.records.entry(order_id).or_insert_with(|| OrderRecord {
            id: order_id,
            customer: order.customer.clone(),
            customer_email: order.customer_email.clone(),
            items: order.items.clone(),
            total: order.amount,
            payment_status: PaymentStatus::Paid,
            fulfillment_status: FulfillmentStatus::Pending,
            created_at: now,
            updated_at: now,
        });

        self.event_sender.send_or_log(Event::OrderPaid(order_id)).await;
        Ok(order)
    }

    pub fn mark_failed(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let mut entry = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        // A paid order never regresses to failed.
        if entry.status == PaymentStatus::AwaitingPayment {
            entry.status = PaymentStatus::Failed;
        }
        Ok(())
    }

    pub fn get_record(&self, order_id: Uuid) -> Result<OrderRecord, ServiceError> {
        self.records
            .get(&order_id)
            .map(|r| r.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Operator read view, newest first.
    pub fn list_records(&self) -> Vec<OrderRecord> {
        let mut records: Vec<OrderRecord> = self.records.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub(crate) fn set_fulfillment_status(
        &self,
        order_id: Uuid,
        status: FulfillmentStatus,
    ) -> Result<OrderRecord, ServiceError> {
        let mut entry = self
            .records
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        entry.fulfillment_status = status;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}
