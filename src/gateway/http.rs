//! HTTP client for the hosted payment gateway REST API.
//!
//! Gateway amounts are integers in minor units (paise for INR); conversion
//! happens at this boundary and nowhere else.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::{config::GatewayConfig, errors::ServiceError};

use super::{GatewayOrder, GatewayPaymentState, PaymentGateway};

#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Debug, Deserialize)]
struct GatewayOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct GatewayPaymentResponse {
    status: String,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
        (amount * Decimal::from(100)).round().to_i64().ok_or_else(|| {
            ServiceError::GatewayError(format!("amount {} not representable in minor units", amount))
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let body = json!({
            "amount": Self::to_minor_units(amount)?,
            "currency": currency,
            "receipt": receipt,
        });

        let response = self
            .client
            .post(format!("{}/orders", self.config.api_base))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("order creation failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            warn!("Gateway rejected order creation: {} {}", status, detail);
            return Err(ServiceError::GatewayError(format!(
                "gateway returned {}: {}",
                status, detail
            )));
        }

        let parsed: GatewayOrderResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("malformed gateway response: {}", e)))?;

        Ok(GatewayOrder {
            id: parsed.id,
            amount: Decimal::from(parsed.amount) / Decimal::from(100),
            currency: parsed.currency,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<GatewayPaymentState, ServiceError> {
        let response = self
            .client
            .get(format!(
                "{}/payments/{}",
                self.config.api_base, gateway_payment_id
            ))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("payment fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::GatewayError(format!(
                "gateway returned {} for payment {}",
                response.status(),
                gateway_payment_id
            )));
        }

        let parsed: GatewayPaymentResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("malformed gateway response: {}", e)))?;

        Ok(match parsed.status.as_str() {
            "captured" => GatewayPaymentState::Captured,
            "authorized" => GatewayPaymentState::Authorized,
            _ => GatewayPaymentState::Failed,
        })
    }
}
