//! Price engine: cart lines in, money breakdown out.
//!
//! Pure and deterministic; no I/O, no error conditions. All rounding is
//! half-up to 2 decimal places so that repeated computation over the same
//! cart can never drift.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    config::PricingConfig,
    models::{Cart, PriceBreakdown},
};

#[derive(Clone)]
pub struct PriceEngine {
    config: PricingConfig,
}

impl PriceEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Computes the full breakdown for a cart.
    ///
    /// Invariants:
    /// - `total == subtotal + shipping_fee + tax`, exactly
    /// - `shipping_fee == 0` iff `subtotal > free_shipping_threshold`,
    ///   else the flat fee; a zero subtotal owes nothing at all
    /// - `tax == round(subtotal * tax_rate, 2)`
    pub fn compute(&self, cart: &Cart) -> PriceBreakdown {
        if cart.is_empty() {
            return PriceBreakdown::zero();
        }

        let subtotal: Decimal = round_money(cart.lines.iter().map(|l| l.line_total()).sum());
        if subtotal.is_zero() {
            return PriceBreakdown::zero();
        }

        let shipping_fee = if subtotal > self.config.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.config.flat_shipping_fee
        };

        let tax = round_money(subtotal * self.config.tax_rate);

        PriceBreakdown {
            subtotal,
            shipping_fee,
            tax,
            total: subtotal + shipping_fee + tax,
        }
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartLine;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn engine() -> PriceEngine {
        PriceEngine::new(PricingConfig::default())
    }

    fn cart(lines: &[(Decimal, i32)]) -> Cart {
        Cart {
            lines: lines
                .iter()
                .map(|(price, qty)| CartLine {
                    product_id: Uuid::new_v4(),
                    name: "Muesli".into(),
                    unit_price: *price,
                    quantity: *qty,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_cart_is_all_zero() {
        let b = engine().compute(&Cart::default());
        assert_eq!(b, PriceBreakdown::zero());
    }

    #[test]
    fn zero_subtotal_owes_nothing() {
        // A cart of complimentary items must not pick up the shipping fee.
        let b = engine().compute(&cart(&[(dec!(0), 2)]));
        assert_eq!(b, PriceBreakdown::zero());
    }

    #[test]
    fn single_line_below_threshold() {
        // 510 < 999: flat shipping, 5% tax
        let b = engine().compute(&cart(&[(dec!(510), 1)]));
        assert_eq!(b.subtotal, dec!(510.00));
        assert_eq!(b.shipping_fee, dec!(50));
        assert_eq!(b.tax, dec!(25.50));
        assert_eq!(b.total, dec!(585.50));
    }

    #[test]
    fn two_units_above_threshold_ship_free() {
        let b = engine().compute(&cart(&[(dec!(680), 2)]));
        assert_eq!(b.subtotal, dec!(1360.00));
        assert_eq!(b.shipping_fee, Decimal::ZERO);
        assert_eq!(b.tax, dec!(68.00));
        assert_eq!(b.total, dec!(1428.00));
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let at = engine().compute(&cart(&[(dec!(999.00), 1)]));
        assert_eq!(at.shipping_fee, dec!(50));

        let above = engine().compute(&cart(&[(dec!(999.01), 1)]));
        assert_eq!(above.shipping_fee, Decimal::ZERO);
    }

    #[test]
    fn tax_rounds_half_up() {
        // 0.05 * 10.10 = 0.505 -> 0.51
        let b = engine().compute(&cart(&[(dec!(10.10), 1)]));
        assert_eq!(b.tax, dec!(0.51));
    }

    #[test]
    fn total_is_exact_sum_of_parts() {
        let b = engine().compute(&cart(&[(dec!(33.33), 3), (dec!(19.99), 7)]));
        assert_eq!(b.total, b.subtotal + b.shipping_fee + b.tax);
    }

    #[test]
    fn recomputation_is_stable() {
        let c = cart(&[(dec!(123.45), 2), (dec!(0.01), 99)]);
        let e = engine();
        assert_eq!(e.compute(&c), e.compute(&c));
    }
}
