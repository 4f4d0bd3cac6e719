//! Shared harness for integration tests: the full router wired over the
//! in-process mock gateway, plus request helpers.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    app, config::AppConfig, gateway::mock::MockGateway, models::Product,
    services::verification::sign_payment, AppState,
};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::default();
        let gateway = Arc::new(MockGateway::new());
        let (state, mut event_rx) =
            AppState::with_gateway(config, gateway.clone()).expect("state");
        tokio::spawn(async move { while event_rx.recv().await.is_some() {} });
        let router = app(state.clone());
        Self {
            router,
            state,
            gateway,
        }
    }

    pub fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.state.catalog.upsert(Product {
            id,
            name: name.to_string(),
            price,
            stock,
        });
        id
    }

    pub fn bearer(&self) -> String {
        let token = self
            .state
            .auth
            .issue_token("cust_test", Some("buyer@example.com"))
            .expect("token");
        format!("Bearer {}", token)
    }

    /// Signs a payment confirmation the way the gateway would.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        sign_payment(
            &self.state.config.gateway.key_secret,
            gateway_order_id,
            gateway_payment_id,
        )
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        auth: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "unexpected status {}",
        response.status()
    );
}
