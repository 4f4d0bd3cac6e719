//! Payment gateway integration.
//!
//! The gateway is callback-based and external; everything that touches it
//! goes through the [`PaymentGateway`] trait so the checkout flow can run
//! against the HTTP client in production and the in-process mock in tests
//! and for orders that need no real gateway interaction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::{errors::ServiceError, models::PaymentOutcome};

pub mod http;
pub mod mock;

/// An order handle reserved with the gateway before any money moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Gateway-side state of a payment, as reported by the gateway API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPaymentState {
    Captured,
    Authorized,
    Failed,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Reserves a gateway order for the given amount. Called during order
    /// initiation; the returned id ties the later payment callback back to
    /// our server order.
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError>;

    /// Fetches the current state of a payment. Used by verification to
    /// confirm capture; transport failures here are the retryable class.
    async fn fetch_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<GatewayPaymentState, ServiceError>;
}

/// Exactly-once gate over the gateway's callback world.
///
/// The third-party widget may invoke its failure callback several times for
/// one payment attempt (internal retries). Only the first outcome passed to
/// [`OutcomeGate::accept`] is forwarded; everything after that is dropped so
/// verification runs at most once per attempt.
#[derive(Debug, Default)]
pub struct OutcomeGate {
    resolved: AtomicBool,
}

impl OutcomeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the outcome on the first call, `None` on every later call.
    pub fn accept(&self, outcome: PaymentOutcome) -> Option<PaymentOutcome> {
        if self.resolved.swap(true, Ordering::SeqCst) {
            debug!("duplicate gateway callback ignored");
            return None;
        }
        Some(outcome)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }
}
