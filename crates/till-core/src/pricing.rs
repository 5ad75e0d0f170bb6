//! # Line Pricing
//!
//! Turns one cart line into `{ subtotal, discount, total }`.
//!
//! ```text
//! subtotal = qty × unit_price
//! raw      = percent ? subtotal × value / 100 : value
//! discount = min(max(raw, 0), subtotal)
//! total    = subtotal − discount          (never negative)
//! ```
//!
//! The same clamp applies to the global discount against the cart subtotal,
//! so both go through [`apply_discount`].

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::money::Money;
use crate::types::{Discount, DiscountType};

/// Priced view of a single cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// Resolves a discount against `base`, clamped into `[0, base]`.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use till_core::money::Money;
/// use till_core::pricing::apply_discount;
/// use till_core::types::Discount;
///
/// let base = Money::from_cents(2000);
/// assert_eq!(apply_discount(base, &Discount::percent(Decimal::from(5))).cents(), 100);
/// assert_eq!(apply_discount(base, &Discount::amount(Decimal::from(50))).cents(), 2000);
/// ```
pub fn apply_discount(base: Money, discount: &Discount) -> Money {
    let raw = match discount.kind {
        DiscountType::Percent => base.percentage(discount.value),
        DiscountType::Amount => Money::from_decimal(discount.value),
    };
    raw.clamp_between(Money::zero(), base.floor_zero())
}

/// Prices a single cart line. Pure and infallible.
pub fn price_line(line: &CartLine) -> LinePricing {
    let subtotal = line.unit_price.multiply_quantity(line.qty).floor_zero();
    let discount = apply_discount(subtotal, &line.discount);

    LinePricing {
        subtotal,
        discount,
        total: subtotal - discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(qty: &str, unit_price: &str, discount: Discount) -> CartLine {
        CartLine {
            product_id: "P1".to_string(),
            name: "Espresso".to_string(),
            unit: "pcs".to_string(),
            qty: crate::money::parse_amount(qty),
            unit_price: Money::parse(unit_price),
            discount,
        }
    }

    #[test]
    fn test_percent_discount_scenario() {
        let pricing = price_line(&line("2", "10,00", Discount::percent(Decimal::from(5))));
        assert_eq!(pricing.subtotal.to_string(), "20.00");
        assert_eq!(pricing.discount.to_string(), "1.00");
        assert_eq!(pricing.total.to_string(), "19.00");
    }

    #[test]
    fn test_amount_discount_clamped_to_subtotal() {
        let pricing = price_line(&line("1", "3.50", Discount::amount(Decimal::from(10))));
        assert_eq!(pricing.discount, pricing.subtotal);
        assert_eq!(pricing.total, Money::zero());
    }

    #[test]
    fn test_percent_over_hundred_clamped() {
        let pricing = price_line(&line("3", "2", Discount::percent(Decimal::from(150))));
        assert_eq!(pricing.subtotal.cents(), 600);
        assert_eq!(pricing.discount.cents(), 600);
        assert_eq!(pricing.total.cents(), 0);
    }

    #[test]
    fn test_negative_discount_clamped_to_zero() {
        let pricing = price_line(&line("1", "4", Discount::amount(Decimal::from(-2))));
        assert_eq!(pricing.discount, Money::zero());
        assert_eq!(pricing.total.cents(), 400);
    }

    #[test]
    fn test_fractional_quantity_rounds_to_cent() {
        let pricing = price_line(&line("1,5", "3.99", Discount::NONE));
        assert_eq!(pricing.subtotal.cents(), 599);
    }

    #[test]
    fn test_malformed_input_prices_as_zero() {
        let pricing = price_line(&line("two", "ten", Discount::percent(Decimal::from(5))));
        assert_eq!(pricing.subtotal, Money::zero());
        assert_eq!(pricing.discount, Money::zero());
        assert_eq!(pricing.total, Money::zero());
    }

    #[test]
    fn test_discount_never_exceeds_subtotal_for_any_input() {
        let discounts = [
            Discount::amount(Decimal::from(0)),
            Discount::amount(Decimal::new(999, 2)),
            Discount::amount(Decimal::from(1000)),
            Discount::percent(Decimal::new(333, 1)),
            Discount::percent(Decimal::from(100)),
            Discount::percent(Decimal::from(-20)),
        ];
        for qty in ["0", "1", "2.5", "7"] {
            for price in ["0", "0.01", "9.99", "120"] {
                for discount in discounts {
                    let p = price_line(&line(qty, price, discount));
                    assert!(p.discount >= Money::zero());
                    assert!(p.discount <= p.subtotal);
                    assert_eq!(p.total, p.subtotal - p.discount);
                }
            }
        }
    }
}
