//! The one piece of mutable state shared across storefront flows.
//!
//! Each session owns exactly one cart, keyed by product id (re-adding a
//! product merges into the existing line). All mutations are total functions
//! over the current cart: no code path leaves a quantity at 0 or a line
//! without a product. Subscribers are notified of every mutation, but the
//! notification is a UI nicety, not part of the contract.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Cart, CartLine},
    services::catalog::CatalogService,
};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<DashMap<Uuid, Cart>>,
    catalog: CatalogService,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(catalog: CatalogService, event_sender: EventSender) -> Self {
        Self {
            carts: Arc::new(DashMap::new()),
            catalog,
            event_sender,
        }
    }

    /// Returns the session's cart, empty if it has never been touched.
    pub fn get(&self, session_id: Uuid) -> Cart {
        self.carts
            .get(&session_id)
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Adds one unit of a product. If the product is already in the cart the
    /// line's quantity grows by one; otherwise a new line is created with the
    /// unit price snapshotted from the catalog at this moment.
    #[instrument(skip(self))]
    pub async fn add_item(&self, session_id: Uuid, product_id: Uuid) -> Result<Cart, ServiceError> {
        let product = self.catalog.get(product_id)?;

        let cart = {
            let mut entry = self.carts.entry(session_id).or_default();
            match entry.lines.iter_mut().find(|l| l.product_id == product_id) {
                Some(line) => line.quantity += 1,
                None => entry.lines.push(CartLine {
                    product_id,
                    name: product.name,
                    unit_price: product.price,
                    quantity: 1,
                }),
            }
            entry.clone()
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                session_id,
                product_id,
            })
            .await;

        Ok(cart)
    }

    /// Removes a line entirely. Removal is always explicit; decrements never
    /// drop a line (see `adjust_quantity`).
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        session_id: Uuid,
        product_id: Uuid,
    ) -> Result<Cart, ServiceError> {
        let cart = {
            let mut entry = self
                .carts
                .get_mut(&session_id)
                .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", session_id)))?;
            let before = entry.lines.len();
            entry.lines.retain(|l| l.product_id != product_id);
            if entry.lines.len() == before {
                return Err(ServiceError::NotFound(format!(
                    "Product {} is not in the cart",
                    product_id
                )));
            }
            entry.clone()
        };

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                session_id,
                product_id,
            })
            .await;

        Ok(cart)
    }

    /// Applies a quantity delta, clamping at 1. Decrementing past 1 leaves
    /// the line at quantity 1 rather than removing it.
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        session_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<Cart, ServiceError> {
        let (cart, quantity) = {
            let mut entry = self
                .carts
                .get_mut(&session_id)
                .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", session_id)))?;
            let line = entry
                .lines
                .iter_mut()
                .find(|l| l.product_id == product_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} is not in the cart", product_id))
                })?;
            line.quantity = (line.quantity + delta).max(1);
            let quantity = line.quantity;
            (entry.clone(), quantity)
        };

        self.event_sender
            .send_or_log(Event::CartQuantityChanged {
                session_id,
                product_id,
                quantity,
            })
            .await;

        Ok(cart)
    }

    /// Empties the cart. Called by the checkout flow only after a verified
    /// paid order, or by the user explicitly.
    #[instrument(skip(self))]
    pub async fn clear(&self, session_id: Uuid) {
        if let Some(mut entry) = self.carts.get_mut(&session_id) {
            entry.lines.clear();
        }
        self.event_sender
            .send_or_log(Event::CartCleared(session_id))
            .await;
        info!("Cleared cart for session {}", session_id);
    }
}
