use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail (e.g. the violated transition rule)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Errors raised by the payment verification step.
///
/// Only `Network` is safe to retry: verification is idempotent on the server
/// by order id. `SignatureMismatch` is never retried automatically because a
/// charge may exist without a verified order record.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("payment signature mismatch for order {0}")]
    SignatureMismatch(Uuid),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    /// The gateway answered, but with something other than a payment state.
    /// Not retryable: the failure was not a transport fault.
    #[error("gateway rejected verification: {0}")]
    Gateway(String),

    #[error("network failure during verification: {0}")]
    Network(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Payment gateway error: {0}")]
    GatewayError(String),

    #[error("Payment verification failed: {0}")]
    VerificationFailed(#[from] VerificationError),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_)
            | ServiceError::InvalidStatus(_)
            | ServiceError::OutOfStock(_) => StatusCode::BAD_REQUEST,
            ServiceError::AuthError(_) => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidOperation(_) => StatusCode::CONFLICT,
            ServiceError::GatewayError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::VerificationFailed(VerificationError::OrderNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::VerificationFailed(VerificationError::Gateway(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ServiceError::VerificationFailed(VerificationError::Network(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::VerificationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: self.to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::AuthError("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::InvalidStatus("Pending -> Delivered".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidOperation("submit in flight".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn signature_mismatch_is_unprocessable() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(VerificationError::SignatureMismatch(id));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn network_verification_failure_is_retryable_surface() {
        let err = ServiceError::from(VerificationError::Network("timed out".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn gateway_verification_failure_is_bad_gateway() {
        let err = ServiceError::from(VerificationError::Gateway("bad payload".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
