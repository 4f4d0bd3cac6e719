use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{OrderDraft, PaymentConfirmation, PaymentOutcome},
    services::checkout::{AttemptState, InitiationResult},
    AppState,
};

use super::bearer;

// POST /api/v1/checkout/{session}/begin
pub async fn begin(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
) -> Json<AttemptState> {
    Json(state.checkout.begin(session_id, bearer(&headers)).await)
}

// GET /api/v1/checkout/{session}
pub async fn attempt_state(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<AttemptState> {
    Json(state.checkout.state(session_id))
}

// POST /api/v1/checkout/{session}
pub async fn submit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<InitiationResult>, ServiceError> {
    let result = state
        .checkout
        .submit(session_id, bearer(&headers), draft)
        .await?;
    Ok(Json(result))
}

/// Payment completion callback, as delivered by the gateway widget: either a
/// signed success payload or an error object with a human-readable
/// description.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentCallback {
    Success {
        gateway_payment_id: String,
        gateway_order_id: String,
        signature: String,
    },
    Failure {
        error: CallbackError,
    },
}

#[derive(Debug, Deserialize)]
pub struct CallbackError {
    pub description: String,
}

// POST /api/v1/checkout/{session}/payment
//
// Returns 200 only when the attempt is verified paid (or the callback was a
// duplicate of an already-settled attempt); verification failures surface as
// error responses, never as silent success.
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Json<AttemptState>, ServiceError> {
    let outcome = match callback {
        PaymentCallback::Success {
            gateway_payment_id,
            gateway_order_id,
            signature,
        } => PaymentOutcome::Success(PaymentConfirmation {
            gateway_payment_id,
            gateway_order_id,
            signature,
        }),
        PaymentCallback::Failure { error } => PaymentOutcome::Failure {
            reason: error.description,
        },
    };

    let attempt = state.checkout.handle_outcome(session_id, outcome).await?;
    Ok(Json(attempt))
}

// POST /api/v1/checkout/{session}/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    state.checkout.reset(session_id);
    StatusCode::NO_CONTENT
}
