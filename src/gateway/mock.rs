//! In-process gateway used by tests and local development.
//!
//! Keeps just enough state to behave like the real thing: created orders are
//! remembered, payment fetches can be made to fail a configured number of
//! times to exercise the verification retry path.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::ServiceError;

use super::{GatewayOrder, GatewayPaymentState, PaymentGateway};

#[derive(Default)]
pub struct MockGateway {
    orders: DashMap<String, GatewayOrder>,
    create_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    /// Number of leading `fetch_payment` calls that fail with a transport error
    fetch_failures: AtomicUsize,
    /// Artificial latency for `create_order`, in milliseconds
    create_delay_ms: AtomicU64,
    payment_state: DashMap<String, GatewayPaymentState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_fetches(&self, n: usize) {
        self.fetch_failures.store(n, Ordering::SeqCst);
    }

    /// Makes every subsequent `create_order` sleep first, so tests can race
    /// other operations against an in-flight initiation.
    pub fn set_create_delay(&self, delay: Duration) {
        self.create_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_payment_state(&self, payment_id: &str, state: GatewayPaymentState) {
        self.payment_state.insert(payment_id.to_string(), state);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let order = GatewayOrder {
            id: format!("gw_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
        };
        self.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<GatewayPaymentState, ServiceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fetch_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fetch_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ServiceError::GatewayError(
                "simulated gateway connection reset".to_string(),
            ));
        }

        Ok(self
            .payment_state
            .get(gateway_payment_id)
            .map(|s| *s)
            .unwrap_or(GatewayPaymentState::Captured))
    }
}
