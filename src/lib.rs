//! Storefront checkout backend.
//!
//! The interesting part of this storefront is the cart-to-paid-order
//! pipeline: a mutable cart, a pure price engine, an order orchestrator that
//! hands off to an external payment gateway, signature-verified payment
//! confirmation, and an operator-facing fulfillment lifecycle. Content
//! rendering (catalog pages, blogs, banners) lives elsewhere; this crate only
//! consumes a read-only product source and exposes placed orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::AuthGate,
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{http::HttpGateway, mock::MockGateway, PaymentGateway},
    services::{
        cart::CartService, catalog::CatalogService, checkout::CheckoutService,
        order_status::OrderLifecycleService, orders::OrderService, pricing::PriceEngine,
        verification::VerificationService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub auth: AuthGate,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub pricing: PriceEngine,
    pub orders: OrderService,
    pub checkout: CheckoutService,
    pub lifecycle: OrderLifecycleService,
}

impl AppState {
    /// Wires every service from configuration. The returned receiver feeds
    /// [`events::process_events`]; the caller decides where to spawn it.
    pub fn new(config: config::AppConfig) -> Result<(Self, mpsc::Receiver<Event>), ServiceError> {
        let gateway: Arc<dyn PaymentGateway> = if config.gateway.mock {
            Arc::new(MockGateway::new())
        } else {
            Arc::new(HttpGateway::new(config.gateway.clone())?)
        };
        Self::with_gateway(config, gateway)
    }

    /// Same wiring with an injected gateway; tests use this to observe or
    /// sabotage gateway interactions.
    pub fn with_gateway(
        config: config::AppConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<(Self, mpsc::Receiver<Event>), ServiceError> {
        let (event_sender, event_rx) = events::channel();

        let auth = AuthGate::new(&config.jwt_secret);
        let catalog = CatalogService::new();
        let carts = CartService::new(catalog.clone(), event_sender.clone());
        let pricing = PriceEngine::new(config.pricing.clone());
        let orders = OrderService::new(event_sender.clone());
        let verification = VerificationService::new(
            orders.clone(),
            gateway.clone(),
            &config.gateway.key_secret,
        );
        let checkout = CheckoutService::new(
            carts.clone(),
            catalog.clone(),
            pricing.clone(),
            auth.clone(),
            orders.clone(),
            verification,
            gateway,
            event_sender.clone(),
            &config.currency,
            &config.gateway.key_id,
        );
        let lifecycle = OrderLifecycleService::new(orders.clone(), event_sender.clone());

        Ok((
            Self {
                config,
                event_sender,
                auth,
                catalog,
                carts,
                pricing,
                orders,
                checkout,
                lifecycle,
            },
            event_rx,
        ))
    }
}

/// Builds the HTTP surface over an assembled state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/v1/carts/:session", get(handlers::carts::get_cart))
        .route(
            "/api/v1/carts/:session/items",
            post(handlers::carts::add_item),
        )
        .route(
            "/api/v1/carts/:session/items/:product_id",
            axum::routing::patch(handlers::carts::adjust_quantity)
                .delete(handlers::carts::remove_item),
        )
        .route(
            "/api/v1/checkout/:session",
            get(handlers::checkout::attempt_state).post(handlers::checkout::submit),
        )
        .route(
            "/api/v1/checkout/:session/begin",
            post(handlers::checkout::begin),
        )
        .route(
            "/api/v1/checkout/:session/payment",
            post(handlers::checkout::payment_callback),
        )
        .route(
            "/api/v1/checkout/:session/reset",
            post(handlers::checkout::reset),
        )
        .route("/api/v1/orders", get(handlers::orders::list_orders))
        .route("/api/v1/orders/:id", get(handlers::orders::get_order))
        .route(
            "/api/v1/orders/:id/status",
            put(handlers::orders::update_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
