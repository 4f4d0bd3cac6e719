//! Checkout orchestration: one state machine per session attempt.
//!
//! The attempt walks `Idle → CollectingInfo → Submitting → AwaitingPayment →
//! Verifying → Success`, detouring to `LoginRequired` when the caller holds no
//! valid session and to `Failed` on any rejection. Two rules hold everywhere:
//! the cart is cleared on the `Verifying → Success` edge and nowhere else, and
//! a failed attempt keeps the entered form data so the buyer resumes instead
//! of retyping.
//!
//! Suspension points are exactly the network calls (gateway order creation,
//! capture confirmation). The attempt's generation counter is bumped by
//! `reset`, and every response that lands after an await re-checks it so a
//! late result for an abandoned attempt is discarded instead of mutating a
//! newer attempt.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthGate,
    errors::{ServiceError, VerificationError},
    events::{Event, EventSender},
    gateway::{OutcomeGate, PaymentGateway},
    models::{Cart, CartLine, OrderDraft, PaymentOutcome},
    services::{
        cart::CartService,
        catalog::CatalogService,
        orders::{NewOrder, OrderService},
        pricing::PriceEngine,
        verification::VerificationService,
    },
};

/// Where a checkout attempt currently stands. Serialized for the storefront
/// UI; every failure carries an assertable reason string.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    LoginRequired,
    CollectingInfo,
    Submitting,
    AwaitingPayment,
    Verifying,
    Success { order_id: Uuid },
    Failed { reason: String },
}

impl AttemptState {
    fn in_flight(&self) -> bool {
        matches!(
            self,
            AttemptState::Submitting | AttemptState::AwaitingPayment | AttemptState::Verifying
        )
    }
}

struct Attempt {
    state: AttemptState,
    /// Bumped on reset; stale async results compare against it and bail.
    generation: u64,
    order_id: Option<Uuid>,
    gate: Arc<OutcomeGate>,
    /// Entered form data, preserved across failures.
    draft: Option<OrderDraft>,
}

impl Default for Attempt {
    fn default() -> Self {
        Self {
            state: AttemptState::Idle,
            generation: 0,
            order_id: None,
            gate: Arc::new(OutcomeGate::new()),
            draft: None,
        }
    }
}

/// What initiation hands back to the storefront: everything the payment
/// widget needs, including the per-order gateway public key. A server-declared
/// `requires_payment: false` replaces the old magic-prefix convention for
/// zero-interaction orders.
#[derive(Debug, Clone, Serialize)]
pub struct InitiationResult {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub key_id: String,
    pub requires_payment: bool,
    pub prefill: Prefill,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    attempts: Arc<dashmap::DashMap<Uuid, Attempt>>,
    carts: CartService,
    catalog: CatalogService,
    pricing: PriceEngine,
    auth: AuthGate,
    orders: OrderService,
    verification: VerificationService,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: EventSender,
    currency: String,
    gateway_key_id: String,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        carts: CartService,
        catalog: CatalogService,
        pricing: PriceEngine,
        auth: AuthGate,
        orders: OrderService,
        verification: VerificationService,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        currency: &str,
        gateway_key_id: &str,
    ) -> Self {
        Self {
            attempts: Arc::new(dashmap::DashMap::new()),
            carts,
            catalog,
            pricing,
            auth,
            orders,
            verification,
            gateway,
            event_sender,
            currency: currency.to_string(),
            gateway_key_id: gateway_key_id.to_string(),
        }
    }

    /// Current state of the session's attempt.
    pub fn state(&self, session_id: Uuid) -> AttemptState {
        self.attempts
            .get(&session_id)
            .map(|a| a.state.clone())
            .unwrap_or(AttemptState::Idle)
    }

    /// Entered form data preserved from a failed or interrupted attempt.
    pub fn saved_draft(&self, session_id: Uuid) -> Option<OrderDraft> {
        self.attempts.get(&session_id).and_then(|a| a.draft.clone())
    }

    /// Enters checkout. Without a valid credential the attempt parks in
    /// `LoginRequired`; once authenticated it resumes to `CollectingInfo`.
    /// A `Failed` or finished attempt restarts; an in-flight one is left
    /// alone.
    #[instrument(skip(self, authorization))]
    pub async fn begin(
        &self,
        session_id: Uuid,
        authorization: Option<&str>,
    ) -> AttemptState {
        let authenticated = self.auth.authenticate(authorization).is_ok();

        let state = {
            let mut attempt = self.attempts.entry(session_id).or_default();
            if attempt.state.in_flight() {
                attempt.state.clone()
            } else {
                attempt.state = if authenticated {
                    AttemptState::CollectingInfo
                } else {
                    AttemptState::LoginRequired
                };
                attempt.state.clone()
            }
        };

        self.event_sender
            .send_or_log(Event::CheckoutStarted(session_id))
            .await;
        state
    }

    /// Submits the checkout form: validates, re-prices server-side, reserves
    /// a server order and a gateway order, and moves to `AwaitingPayment`
    /// (or straight through verification when no payment is required).
    #[instrument(skip(self, authorization, draft))]
    pub async fn submit(
        &self,
        session_id: Uuid,
        authorization: Option<&str>,
        draft: OrderDraft,
    ) -> Result<InitiationResult, ServiceError> {
        // Authentication gate. The draft is kept so the buyer resumes with
        // the form intact after logging in.
        let session = match self.auth.authenticate(authorization) {
            Ok(session) => session,
            Err(err) => {
                let mut attempt = self.attempts.entry(session_id).or_default();
                attempt.state = AttemptState::LoginRequired;
                attempt.draft = Some(draft);
                return Err(err);
            }
        };

        // Presence validation only; business rules are checked below against
        // the catalog. Validation failures never leave `CollectingInfo`.
        if let Err(e) = draft.contact.validate() {
            self.store_draft(session_id, draft);
            return Err(e.into());
        }
        if let Err(e) = draft.shipping_address.validate() {
            self.store_draft(session_id, draft);
            return Err(e.into());
        }
        if draft.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "cart is empty".to_string(),
            ));
        }

        // Debounce: one submission at a time per session.
        let generation = {
            let mut attempt = self.attempts.entry(session_id).or_default();
            if attempt.state.in_flight() {
                return Err(ServiceError::InvalidOperation(
                    "a checkout submission is already in progress".to_string(),
                ));
            }
            attempt.state = AttemptState::Submitting;
            attempt.draft = Some(draft.clone());
            attempt.generation
        };

        match self
            .initiate(session_id, generation, &session.customer, &draft)
            .await
        {
            Ok(result) => Ok(result),
            Err(err) => {
                self.fail_if_current(session_id, generation, err.to_string())
                    .await;
                Err(err)
            }
        }
    }

    async fn initiate(
        &self,
        session_id: Uuid,
        generation: u64,
        customer: &str,
        draft: &OrderDraft,
    ) -> Result<InitiationResult, ServiceError> {
        // The server is the price authority: quantities come from the draft,
        // prices and stock from the catalog.
        let mut lines = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            let product = self.catalog.ensure_in_stock(item.product_id, item.quantity)?;
            lines.push(CartLine {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
            });
        }

        let breakdown = self.pricing.compute(&Cart {
            lines: lines.clone(),
        });
        let requires_payment = !breakdown.total.is_zero();

        let gateway_order_id = if requires_payment {
            self.gateway
                .create_order(
                    breakdown.total,
                    &self.currency,
                    &format!("session_{}", session_id.simple()),
                )
                .await?
                .id
        } else {
            // No gateway interaction needed; the handle only ties the
            // synthetic outcome back to this order.
            format!("waived_{}", Uuid::new_v4().simple())
        };

        let order = self
            .orders
            .create(NewOrder {
                customer: customer.to_string(),
                customer_email: draft.contact.email.clone(),
                items: lines,
                shipping_address: draft.shipping_address.clone(),
                amount: breakdown.total,
                currency: self.currency.clone(),
                gateway_order_id: gateway_order_id.clone(),
            })
            .await;

        {
            // The gateway and order-book round-trips above are suspension
            // points; a reset issued while they were in flight must win.
            let mut attempt = self.attempts.entry(session_id).or_default();
            if attempt.generation != generation {
                warn!(
                    "Discarding initiation result for abandoned attempt (session {})",
                    session_id
                );
                return Err(ServiceError::InvalidOperation(
                    "checkout attempt was abandoned".to_string(),
                ));
            }
            attempt.state = AttemptState::AwaitingPayment;
            attempt.order_id = Some(order.id);
            attempt.gate = Arc::new(OutcomeGate::new());
        }

        self.event_sender
            .send_or_log(Event::OrderInitiated {
                session_id,
                order_id: order.id,
            })
            .await;

        let result = InitiationResult {
            order_id: order.id,
            gateway_order_id,
            amount: order.amount,
            currency: order.currency.clone(),
            key_id: self.gateway_key_id.clone(),
            requires_payment,
            prefill: Prefill {
                name: draft.contact.full_name(),
                email: draft.contact.email.clone(),
                contact: draft.contact.phone.clone(),
            },
        };

        if !requires_payment {
            // Zero-interaction path: synthesize the success outcome and run
            // the same verification authority as a real payment.
            self.complete_waived(session_id, generation, order.id).await?;
        }

        Ok(result)
    }

    async fn complete_waived(
        &self,
        session_id: Uuid,
        generation: u64,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.set_verifying(session_id, generation)?;
        self.verification
            .confirm_waived(order_id)
            .await
            .map_err(ServiceError::from)?;
        self.finish_success(session_id, generation, order_id).await;
        Ok(())
    }

    /// Feeds a gateway outcome into the attempt.
    ///
    /// Exactly-once: the widget may fire its failure callback repeatedly, so
    /// only the first outcome per submission passes the gate; later ones are
    /// dropped and the current state is returned unchanged. A success outcome
    /// moves to `Verifying` and runs the verification authority; a failure
    /// outcome moves to `Failed` with the cart intact.
    #[instrument(skip(self, outcome))]
    pub async fn handle_outcome(
        &self,
        session_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<AttemptState, ServiceError> {
        let (generation, order_id, accepted) = {
            let attempt = self.attempts.get(&session_id).ok_or_else(|| {
                ServiceError::NotFound(format!("no checkout attempt for session {}", session_id))
            })?;

            if attempt.state != AttemptState::AwaitingPayment {
                info!(
                    "Late or duplicate gateway callback for session {} ignored (state {:?})",
                    session_id, attempt.state
                );
                return Ok(attempt.state.clone());
            }

            let order_id = attempt.order_id.ok_or_else(|| {
                ServiceError::InternalError("awaiting payment without an order".to_string())
            })?;
            (attempt.generation, order_id, attempt.gate.accept(outcome))
        };

        let Some(outcome) = accepted else {
            return Ok(self.state(session_id));
        };

        match outcome {
            PaymentOutcome::Failure { reason } => {
                self.orders.mark_failed(order_id)?;
                self.fail_if_current(session_id, generation, format!("payment failed: {}", reason))
                    .await;
                Ok(self.state(session_id))
            }
            PaymentOutcome::Success(confirmation) => {
                self.set_verifying(session_id, generation)?;
                match self.verification.verify(&confirmation, order_id).await {
                    Ok(_) => {
                        self.finish_success(session_id, generation, order_id).await;
                        Ok(self.state(session_id))
                    }
                    Err(err) => {
                        let reason = support_message(&err, order_id);
                        self.fail_if_current(session_id, generation, reason).await;
                        Err(err.into())
                    }
                }
            }
        }
    }

    /// Abandons the attempt (navigation away, unmount). The state returns to
    /// `Idle` immediately regardless of in-flight calls; their results are
    /// discarded when they land.
    #[instrument(skip(self))]
    pub fn reset(&self, session_id: Uuid) {
        let mut attempt = self.attempts.entry(session_id).or_default();
        attempt.generation += 1;
        attempt.state = AttemptState::Idle;
        attempt.order_id = None;
        attempt.gate = Arc::new(OutcomeGate::new());
    }

    fn store_draft(&self, session_id: Uuid, draft: OrderDraft) {
        let mut attempt = self.attempts.entry(session_id).or_default();
        attempt.state = AttemptState::CollectingInfo;
        attempt.draft = Some(draft);
    }

    fn set_verifying(&self, session_id: Uuid, generation: u64) -> Result<(), ServiceError> {
        let mut attempt = self
            .attempts
            .get_mut(&session_id)
            .ok_or_else(|| ServiceError::NotFound("no checkout attempt".to_string()))?;
        if attempt.generation != generation {
            return Err(ServiceError::InvalidOperation(
                "checkout attempt was abandoned".to_string(),
            ));
        }
        attempt.state = AttemptState::Verifying;
        Ok(())
    }

    /// Applies the success transition, unless the attempt was reset while the
    /// verification round-trip was in flight. The order itself stays paid
    /// either way; only this session's UI state and cart are touched.
    async fn finish_success(&self, session_id: Uuid, generation: u64, order_id: Uuid) {
        let apply = {
            let mut attempt = match self.attempts.get_mut(&session_id) {
                Some(a) => a,
                None => return,
            };
            if attempt.generation != generation {
                warn!(
                    "Discarding verification result for abandoned attempt (session {})",
                    session_id
                );
                false
            } else {
                attempt.state = AttemptState::Success { order_id };
                attempt.draft = None;
                true
            }
        };

        if apply {
            // Stock commits and the cart clears only on this edge.
            if let Ok(order) = self.orders.get(order_id) {
                for line in &order.items {
                    if let Err(e) = self.catalog.commit_stock(line.product_id, line.quantity) {
                        warn!("Stock commit for order {} failed: {}", order_id, e);
                    }
                }
            }
            self.carts.clear(session_id).await;
        }
    }

    /// Records a failure unless the attempt was reset while a call was in
    /// flight. Never touches the cart.
    async fn fail_if_current(&self, session_id: Uuid, generation: u64, reason: String) {
        {
            let mut attempt = match self.attempts.get_mut(&session_id) {
                Some(a) => a,
                None => return,
            };
            if attempt.generation != generation {
                return;
            }
            attempt.state = AttemptState::Failed {
                reason: reason.clone(),
            };
        }
        self.event_sender
            .send_or_log(Event::CheckoutFailed { session_id, reason })
            .await;
    }
}

fn support_message(err: &VerificationError, order_id: Uuid) -> String {
    match err {
        VerificationError::Network(_) => format!(
            "payment verification could not reach the gateway; \
             it is safe to retry verification for order {}",
            order_id
        ),
        _ => format!(
            "payment verification failed for order {}; \
             please contact support with this order id before retrying",
            order_id
        ),
    }
}
