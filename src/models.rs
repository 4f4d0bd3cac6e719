//! Domain model for the checkout pipeline.
//!
//! Monetary values are `rust_decimal::Decimal` everywhere; floats never touch
//! money. `PriceBreakdown` is derived state and is recomputed from the cart on
//! every read rather than stored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A catalog product as seen by the checkout core: a read-only record with a
/// server-authoritative price and stock level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// One line of a shopping cart.
///
/// The unit price is snapshotted when the line is created; later catalog price
/// changes do not retroactively alter an open cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An ordered collection of cart lines, one per product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn total_quantity(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Derived totals for a cart. Always recomputed, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// Contact details entered on the checkout form.
#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
pub struct ContactInfo {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
}

impl ContactInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Shipping address entered on the checkout form. Presence validation only;
/// business validation is the server's job at initiation time.
#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub zip: String,
}

/// The payload that initiates an order: a cart snapshot of (product, quantity)
/// pairs plus contact and shipping details. Prices are deliberately absent;
/// the server re-prices from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub items: Vec<DraftItem>,
    pub contact: ContactInfo,
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Payment status of a server-issued order. This is the single source of
/// truth for "is this paid"; a gateway callback alone never flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    AwaitingPayment,
    Paid,
    Failed,
}

/// An order reserved on the server before any money moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOrder {
    pub id: Uuid,
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub customer: String,
    pub customer_email: String,
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
}

/// Signed success payload delivered by the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub signature: String,
}

/// Transient outcome of one gateway interaction. Lives for the duration of a
/// single checkout attempt and is never stored.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Success(PaymentConfirmation),
    Failure { reason: String },
}

/// Operator-visible lifecycle of a paid order, distinct from payment status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// The operator-side record of a paid order. Created when a `ServerOrder`
/// becomes `Paid`; mutated only by operator action; never deleted (cancelling
/// is a terminal state, not removal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub customer: String,
    pub customer_email: String,
    pub items: Vec<CartLine>,
    pub total: Decimal,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(qty: i32, price: Decimal) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            name: "Granola".into(),
            unit_price: price,
            quantity: qty,
        }
    }

    #[test]
    fn line_total_multiplies_snapshot_price() {
        let l = line(3, dec!(25.50));
        assert_eq!(l.line_total(), dec!(76.50));
    }

    #[test]
    fn cart_quantity_sums_lines() {
        let cart = Cart {
            lines: vec![line(2, dec!(10)), line(5, dec!(1))],
        };
        assert_eq!(cart.total_quantity(), 7);
    }

    #[test]
    fn fulfillment_status_parses_case_insensitively() {
        let parsed: FulfillmentStatus = "shipped".parse().expect("parse");
        assert_eq!(parsed, FulfillmentStatus::Shipped);
        assert!(!parsed.is_terminal());
        assert!(FulfillmentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn payment_status_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::AwaitingPayment).expect("json");
        assert_eq!(json, "\"awaiting_payment\"");
    }
}
