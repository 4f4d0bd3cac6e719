//! Operator console tests: listing paid orders and walking the fulfillment
//! lifecycle through the HTTP surface.

mod common;

use axum::http::{Method, StatusCode};
use common::{assert_status, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::models::{CartLine, ShippingAddress};
use storefront_api::services::orders::NewOrder;
use test_case::test_case;
use uuid::Uuid;

/// Seeds a paid order directly through the order book, the same way a
/// verified payment would.
async fn seed_paid_order(app: &TestApp) -> Uuid {
    let order = app
        .state
        .orders
        .create(NewOrder {
            customer: "cust_test".into(),
            customer_email: "buyer@example.com".into(),
            items: vec![CartLine {
                product_id: Uuid::new_v4(),
                name: "Muesli".into(),
                unit_price: dec!(510),
                quantity: 1,
            }],
            shipping_address: ShippingAddress {
                street: "12 Hill Rd".into(),
                city: "Pune".into(),
                state: "MH".into(),
                zip: "411001".into(),
            },
            amount: dec!(585.50),
            currency: "INR".into(),
            gateway_order_id: "gw_seeded".into(),
        })
        .await;
    app.state.orders.mark_paid(order.id).await.expect("paid");
    order.id
}

async fn put_status(app: &TestApp, order_id: Uuid, status: &str) -> (StatusCode, serde_json::Value) {
    let auth = app.bearer();
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "new_status": status })),
            Some(&auth),
        )
        .await;
    let status_code = response.status();
    (status_code, response_json(response).await)
}

#[tokio::test]
async fn order_endpoints_require_a_credential() {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    let list = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_status(&list, StatusCode::UNAUTHORIZED);

    let get = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            None,
        )
        .await;
    assert_status(&get, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn paid_order_starts_pending() {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    let auth = app.bearer();
    let body = response_json(
        app.request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&auth),
        )
        .await,
    )
    .await;
    assert_eq!(body["fulfillment_status"], json!("Pending"));
    assert_eq!(body["payment_status"], json!("paid"));
}

#[tokio::test]
async fn full_forward_walk_succeeds() {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    for step in ["Processing", "Shipped", "Delivered"] {
        let (status, body) = put_status(&app, order_id, step).await;
        assert_eq!(status, StatusCode::OK, "step {} failed: {}", step, body);
        assert_eq!(body["fulfillment_status"], json!(step));
    }
}

#[test_case("Delivered", "one step at a time" ; "pending cannot skip to delivered")]
#[test_case("Shipped", "one step at a time" ; "pending cannot skip to shipped")]
#[test_case("Pending", "already" ; "no-op transition is rejected")]
#[tokio::test]
async fn invalid_transitions_from_pending_name_the_rule(status: &str, rule: &str) {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    let (code, body) = put_status(&app, order_id, status).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().expect("message");
    assert!(message.contains(rule), "unexpected rule text: {}", message);
}

#[tokio::test]
async fn cancel_is_allowed_mid_flight_but_terminal() {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    let (code, _) = put_status(&app, order_id, "Processing").await;
    assert_eq!(code, StatusCode::OK);
    let (code, body) = put_status(&app, order_id, "Cancelled").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["fulfillment_status"], json!("Cancelled"));

    // Terminal: nothing moves out of Cancelled.
    let (code, body) = put_status(&app, order_id, "Processing").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("terminal"));
}

#[tokio::test]
async fn status_parsing_is_case_insensitive() {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    let (code, body) = put_status(&app, order_id, "processing").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["fulfillment_status"], json!("Processing"));
}

#[tokio::test]
async fn unknown_status_lists_the_valid_ones() {
    let app = TestApp::new();
    let order_id = seed_paid_order(&app).await;

    let (code, body) = put_status(&app, order_id, "Teleported").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("Teleported"));
    assert!(message.contains("Delivered"));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::new();
    let (code, _) = put_status(&app, Uuid::new_v4(), "Processing").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}
