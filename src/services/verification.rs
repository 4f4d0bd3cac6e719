//! Payment verification: the only authority allowed to mark an order paid.
//!
//! A successful gateway callback is provisional. Verification checks the
//! callback's HMAC signature against the gateway secret, matches it to the
//! stored server order, confirms capture with the gateway, and only then
//! flips the order to paid. Network failures during the capture round-trip
//! are retried a bounded number of times; the whole step is idempotent by
//! order id, so a retry can never double-record a payment.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::{ServiceError, VerificationError},
    gateway::{GatewayPaymentState, PaymentGateway},
    models::{PaymentConfirmation, ServerOrder},
    services::orders::OrderService,
};

type HmacSha256 = Hmac<Sha256>;

const MAX_NETWORK_RETRIES: usize = 3;

/// Computes the signature the gateway attaches to a successful payment:
/// HMAC-SHA256 over `"{gateway_order_id}|{gateway_payment_id}"`, hex-encoded.
pub fn sign_payment(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[derive(Clone)]
pub struct VerificationService {
    orders: OrderService,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
}

impl VerificationService {
    pub fn new(orders: OrderService, gateway: Arc<dyn PaymentGateway>, key_secret: &str) -> Self {
        Self {
            orders,
            gateway,
            key_secret: key_secret.to_string(),
        }
    }

    /// Verifies a signed payment confirmation against a server order.
    ///
    /// Error taxonomy:
    /// - `OrderNotFound` — no such server order, or the callback's gateway
    ///   order id does not belong to it; not retried.
    /// - `SignatureMismatch` — the payload was not signed with our secret;
    ///   never retried automatically, the caller routes the user to support.
    /// - `Network` — the capture confirmation round-trip failed in transport;
    ///   retried up to `MAX_NETWORK_RETRIES` times before surfacing.
    /// - `Gateway` — the gateway answered with something other than a payment
    ///   state; surfaced immediately, never retried.
    #[instrument(skip(self, confirmation), fields(order_id = %order_id))]
    pub async fn verify(
        &self,
        confirmation: &PaymentConfirmation,
        order_id: Uuid,
    ) -> Result<ServerOrder, VerificationError> {
        let order = self
            .orders
            .get(order_id)
            .map_err(|_| VerificationError::OrderNotFound(order_id))?;

        if order.gateway_order_id != confirmation.gateway_order_id {
            warn!(
                "Callback for gateway order {} does not match order {}",
                confirmation.gateway_order_id, order_id
            );
            return Err(VerificationError::OrderNotFound(order_id));
        }

        let expected = sign_payment(
            &self.key_secret,
            &confirmation.gateway_order_id,
            &confirmation.gateway_payment_id,
        );
        if !constant_time_eq(&expected, &confirmation.signature) {
            error!("Signature mismatch for order {}", order_id);
            return Err(VerificationError::SignatureMismatch(order_id));
        }

        self.confirm_capture(&confirmation.gateway_payment_id, order_id)
            .await?;

        let paid = self
            .orders
            .mark_paid(order_id)
            .await
            .map_err(|_| VerificationError::OrderNotFound(order_id))?;

        info!("Order {} verified and marked paid", order_id);
        Ok(paid)
    }

    /// Confirms a zero-interaction order: no gateway payment exists, so the
    /// only checks are that the order is ours and genuinely owes nothing.
    /// Paid status still flows through this service and nowhere else.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn confirm_waived(&self, order_id: Uuid) -> Result<ServerOrder, VerificationError> {
        let order = self
            .orders
            .get(order_id)
            .map_err(|_| VerificationError::OrderNotFound(order_id))?;

        if !order.amount.is_zero() {
            error!(
                "Refusing waived confirmation for order {} with amount {}",
                order_id, order.amount
            );
            return Err(VerificationError::SignatureMismatch(order_id));
        }

        self.orders
            .mark_paid(order_id)
            .await
            .map_err(|_| VerificationError::OrderNotFound(order_id))
    }

    async fn confirm_capture(
        &self,
        gateway_payment_id: &str,
        order_id: Uuid,
    ) -> Result<(), VerificationError> {
        let mut last_err = String::new();
        for attempt in 1..=MAX_NETWORK_RETRIES {
            match self.gateway.fetch_payment(gateway_payment_id).await {
                Ok(GatewayPaymentState::Captured) | Ok(GatewayPaymentState::Authorized) => {
                    return Ok(())
                }
                Ok(GatewayPaymentState::Failed) => {
                    // The gateway itself says the payment did not go through;
                    // this is a signature-valid but unpaid callback.
                    return Err(VerificationError::SignatureMismatch(order_id));
                }
                Err(ServiceError::GatewayError(msg)) => {
                    warn!(
                        "Capture confirmation attempt {}/{} failed: {}",
                        attempt, MAX_NETWORK_RETRIES, msg
                    );
                    last_err = msg;
                }
                Err(other) => {
                    // Not a transport fault, so not safe to label retryable.
                    return Err(VerificationError::Gateway(other.to_string()));
                }
            }
        }
        Err(VerificationError::Network(last_err))
    }
}
