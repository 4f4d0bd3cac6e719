//! Session credential validation.
//!
//! The checkout pipeline only needs to know whether a caller holds a valid
//! session; it never issues credentials itself (the storefront's login flow
//! does that). Tokens are HS256 JWTs carrying the customer identity.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Customer identity
    pub sub: String,
    /// Customer email, if known at login time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// An authenticated storefront session.
#[derive(Debug, Clone)]
pub struct Session {
    pub customer: String,
    pub email: Option<String>,
}

/// Gatekeeper for checkout submission: resolves a bearer credential into a
/// `Session` or an `AuthError`.
#[derive(Clone)]
pub struct AuthGate {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl AuthGate {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Validates an `Authorization` header value of the form `Bearer <jwt>`.
    ///
    /// A missing header, a malformed scheme, and an invalid or expired token
    /// all surface as `ServiceError::AuthError` so the caller can prompt for
    /// login while preserving checkout state.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Session, ServiceError> {
        let header = authorization
            .ok_or_else(|| ServiceError::AuthError("missing bearer credential".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::AuthError("malformed authorization header".to_string()))?;

        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| ServiceError::AuthError(format!("invalid session token: {}", e)))?;

        Ok(Session {
            customer: data.claims.sub,
            email: data.claims.email,
        })
    }

    /// Mints a session token. Used by the storefront login flow and by tests;
    /// the checkout pipeline itself only validates.
    pub fn issue_token(&self, customer: &str, email: Option<&str>) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: customer.to_string(),
            email: email.map(|e| e.to_string()),
            iat: now.timestamp(),
            exp: (now + Duration::hours(24)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn gate() -> AuthGate {
        AuthGate::new("unit_test_secret_that_is_long_enough_for_hs256_use_only_in_tests")
    }

    #[test]
    fn valid_token_round_trips() {
        let gate = gate();
        let token = gate.issue_token("cust_42", Some("c@example.com")).expect("token");
        let session = gate
            .authenticate(Some(&format!("Bearer {}", token)))
            .expect("session");
        assert_eq!(session.customer, "cust_42");
        assert_eq!(session.email.as_deref(), Some("c@example.com"));
    }

    #[test]
    fn missing_header_is_auth_error() {
        assert_matches!(gate().authenticate(None), Err(ServiceError::AuthError(_)));
    }

    #[test]
    fn wrong_scheme_is_auth_error() {
        assert_matches!(
            gate().authenticate(Some("Basic abc")),
            Err(ServiceError::AuthError(_))
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = AuthGate::new("a_completely_different_secret_also_long_enough_for_hs256_x");
        let token = other.issue_token("cust_1", None).expect("token");
        assert_matches!(
            gate().authenticate(Some(&format!("Bearer {}", token))),
            Err(ServiceError::AuthError(_))
        );
    }
}
