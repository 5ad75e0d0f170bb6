//! # Cart
//!
//! The ad-hoc cart, the cart source that makes it mutually exclusive with a
//! bridged kitchen order, and the aggregated transaction totals.
//!
//! ## Cart Source
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CartSource                                     │
//! │                                                                         │
//! │   AdHoc(Cart)                       Bridged(KitchenOrderSnapshot)       │
//! │   ───────────                       ─────────────────────────────       │
//! │   lines + global discount           server totals, read-only            │
//! │   totals recomputed on read         totals copied verbatim              │
//! │   mutations allowed                 mutations → ModeExclusive           │
//! │                                                                         │
//! │   Exactly one variant exists at a time; "both" is unrepresentable.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{parse_amount, Money};
use crate::pricing::{apply_discount, price_line, LinePricing};
use crate::types::{Discount, DiscountType, KitchenOrderSnapshot, ProductRef};
use crate::validation::validate_non_negative;
use crate::MAX_CART_LINES;

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the ad-hoc cart.
///
/// ## Invariants
/// - `qty`, `unit_price` and `discount.value` are never negative
/// - Lines are unique by `product_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub qty: Decimal,
    pub unit_price: Money,
    pub discount: Discount,
}

impl CartLine {
    /// Creates a line from a product; the unit price defaults to the
    /// product's selling price, or zero when it has none.
    pub fn from_product(product: &ProductRef, qty: Decimal) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit: product.unit.clone(),
            qty,
            unit_price: product.selling_price.unwrap_or_default(),
            discount: Discount::NONE,
        }
    }

    pub fn pricing(&self) -> LinePricing {
        price_line(self)
    }
}

// =============================================================================
// Transaction Totals
// =============================================================================

/// Transaction-level totals. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionTotals {
    pub subtotal: Money,
    pub line_discount_total: Money,
    pub global_discount_total: Money,
    pub net_total: Money,
}

impl TransactionTotals {
    /// Copies a kitchen snapshot's totals verbatim.
    pub fn from_snapshot(snapshot: &KitchenOrderSnapshot) -> Self {
        TransactionTotals {
            subtotal: snapshot.subtotal,
            line_discount_total: snapshot.discount_total,
            global_discount_total: Money::zero(),
            net_total: snapshot.total,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The ad-hoc shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    global_discount: Discount,
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            global_discount: Discount::NONE,
            created_at: Utc::now(),
        }
    }

    /// Adds a product, or increases its quantity if it is already present.
    pub fn add_product(&mut self, product: &ProductRef, qty: Decimal) -> CoreResult<()> {
        validate_non_negative("quantity", qty)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.qty = line.qty.checked_add(qty).ok_or_else(|| ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: "0".to_string(),
                max: Decimal::MAX.to_string(),
            })?;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_product(product, qty));
        Ok(())
    }

    /// Sets a line quantity from free text. Unparseable input reads as zero.
    pub fn set_quantity(&mut self, product_id: &str, raw: &str) -> CoreResult<()> {
        let qty = parse_amount(raw);
        validate_non_negative("quantity", qty)?;
        self.line_mut(product_id)?.qty = qty;
        Ok(())
    }

    /// Sets a line unit price from free text.
    pub fn set_unit_price(&mut self, product_id: &str, raw: &str) -> CoreResult<()> {
        let price = parse_amount(raw);
        validate_non_negative("unit price", price)?;
        self.line_mut(product_id)?.unit_price = Money::from_decimal(price);
        Ok(())
    }

    /// Sets a line discount from free text.
    pub fn set_line_discount(
        &mut self,
        product_id: &str,
        raw: &str,
        kind: DiscountType,
    ) -> CoreResult<()> {
        let value = parse_amount(raw);
        validate_non_negative("discount", value)?;
        self.line_mut(product_id)?.discount = Discount { value, kind };
        Ok(())
    }

    /// Sets the cart-wide discount from free text.
    pub fn set_global_discount(&mut self, raw: &str, kind: DiscountType) -> CoreResult<()> {
        let value = parse_amount(raw);
        validate_non_negative("global discount", value)?;
        self.global_discount = Discount { value, kind };
        Ok(())
    }

    /// Overwrites the unit price of a line after a price recovery.
    ///
    /// Returns `false` when the product is no longer in the cart.
    pub fn patch_unit_price(&mut self, product_id: &str, price: Money) -> bool {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.unit_price = price;
                true
            }
            None => false,
        }
    }

    /// Removes a line by product ID.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all lines and the global discount.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.global_discount = Discount::NONE;
        self.created_at = Utc::now();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn global_discount(&self) -> Discount {
        self.global_discount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the summed quantity over all lines.
    pub fn total_quantity(&self) -> Decimal {
        self.lines.iter().map(|l| l.qty).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Aggregates line pricing and the global discount.
    ///
    /// ```text
    /// subtotal              = Σ line.subtotal
    /// line_discount_total   = Σ line.discount
    /// global_discount_total = clamp(global, 0, subtotal − line_discount_total)
    /// net_total             = max(subtotal − line − global, 0)
    /// ```
    pub fn totals(&self) -> TransactionTotals {
        let (subtotal, line_discount_total) = self
            .lines
            .iter()
            .map(price_line)
            .fold((Money::zero(), Money::zero()), |(sub, disc), p| {
                (sub + p.subtotal, disc + p.discount)
            });

        let discountable = (subtotal - line_discount_total).floor_zero();
        let global_discount_total = apply_discount(discountable, &self.global_discount);

        TransactionTotals {
            subtotal,
            line_discount_total,
            global_discount_total,
            net_total: (subtotal - line_discount_total - global_discount_total).floor_zero(),
        }
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))
    }
}

// =============================================================================
// Cart Source
// =============================================================================

/// The active transaction source: an ad-hoc cart or a bridged kitchen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "source", rename_all = "snake_case")]
pub enum CartSource {
    AdHoc(Cart),
    Bridged(KitchenOrderSnapshot),
}

impl Default for CartSource {
    fn default() -> Self {
        CartSource::AdHoc(Cart::new())
    }
}

impl CartSource {
    /// Totals for whichever source is active.
    pub fn totals(&self) -> TransactionTotals {
        match self {
            CartSource::AdHoc(cart) => cart.totals(),
            CartSource::Bridged(snapshot) => TransactionTotals::from_snapshot(snapshot),
        }
    }

    pub fn is_bridged(&self) -> bool {
        matches!(self, CartSource::Bridged(_))
    }

    /// The bridged order's ID, if any.
    pub fn bridged_order_id(&self) -> Option<&str> {
        match self {
            CartSource::Bridged(snapshot) => Some(&snapshot.order_id),
            CartSource::AdHoc(_) => None,
        }
    }

    pub fn cart(&self) -> Option<&Cart> {
        match self {
            CartSource::AdHoc(cart) => Some(cart),
            CartSource::Bridged(_) => None,
        }
    }

    /// Mutable cart access; refuses while a kitchen order is bridged.
    pub fn cart_mut(&mut self, operation: &'static str) -> CoreResult<&mut Cart> {
        match self {
            CartSource::AdHoc(cart) => Ok(cart),
            CartSource::Bridged(_) => Err(CoreError::ModeExclusive { operation }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn espresso() -> ProductRef {
        ProductRef::new("P1", "Espresso", "pcs")
    }

    fn scenario_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_product(&espresso(), Decimal::from(2)).unwrap();
        cart.set_unit_price("P1", "10,00").unwrap();
        cart.set_line_discount("P1", "5", DiscountType::Percent).unwrap();
        cart
    }

    fn snapshot() -> KitchenOrderSnapshot {
        KitchenOrderSnapshot {
            order_id: "ORD-1".to_string(),
            table_label: Some("T2".to_string()),
            lines: Vec::new(),
            subtotal: Money::from_cents(4200),
            discount_total: Money::from_cents(700),
            total: Money::from_cents(3500),
        }
    }

    #[test]
    fn test_add_same_product_merges_quantity() {
        let mut cart = Cart::new();
        cart.add_product(&espresso(), Decimal::from(2)).unwrap();
        cart.add_product(&espresso(), Decimal::from(3)).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), Decimal::from(5));
    }

    #[test]
    fn test_add_product_uses_selling_price() {
        let mut cart = Cart::new();
        let priced = espresso().with_selling_price(Money::from_cents(250));
        cart.add_product(&priced, Decimal::ONE).unwrap();
        assert_eq!(cart.line("P1").unwrap().unit_price.cents(), 250);
    }

    #[test]
    fn test_scenario_net_total_without_global_discount() {
        let totals = scenario_cart().totals();
        assert_eq!(totals.subtotal.to_string(), "20.00");
        assert_eq!(totals.line_discount_total.to_string(), "1.00");
        assert_eq!(totals.global_discount_total, Money::zero());
        assert_eq!(totals.net_total.to_string(), "19.00");
    }

    #[test]
    fn test_scenario_net_total_with_global_amount_discount() {
        let mut cart = scenario_cart();
        cart.set_global_discount("2", DiscountType::Amount).unwrap();
        let totals = cart.totals();
        assert_eq!(totals.global_discount_total.to_string(), "2.00");
        assert_eq!(totals.net_total.to_string(), "17.00");
    }

    #[test]
    fn test_global_discount_clamped_to_discounted_subtotal() {
        let mut cart = scenario_cart();
        cart.set_global_discount("500", DiscountType::Amount).unwrap();
        let totals = cart.totals();
        assert_eq!(totals.global_discount_total.to_string(), "19.00");
        assert_eq!(totals.net_total, Money::zero());

        cart.set_global_discount("10", DiscountType::Percent).unwrap();
        assert_eq!(cart.totals().global_discount_total.to_string(), "1.90");
    }

    #[test]
    fn test_net_total_identity_holds() {
        let mut cart = scenario_cart();
        let other = ProductRef::new("P2", "Croissant", "pcs");
        cart.add_product(&other, Decimal::from(3)).unwrap();
        cart.set_unit_price("P2", "1.35").unwrap();
        cart.set_line_discount("P2", "0.40", DiscountType::Amount).unwrap();
        cart.set_global_discount("7.5", DiscountType::Percent).unwrap();

        let t = cart.totals();
        assert!(t.net_total >= Money::zero());
        assert_eq!(
            t.net_total,
            t.subtotal - t.line_discount_total - t.global_discount_total
        );
    }

    #[test]
    fn test_negative_input_rejected() {
        let mut cart = scenario_cart();
        assert!(cart.set_quantity("P1", "-1").is_err());
        assert!(cart.set_unit_price("P1", "-3").is_err());
        assert!(cart.set_line_discount("P1", "-5", DiscountType::Amount).is_err());
        assert!(cart.set_global_discount("-1", DiscountType::Amount).is_err());
        // Unchanged
        assert_eq!(cart.totals().net_total.to_string(), "19.00");
    }

    #[test]
    fn test_edit_unknown_line() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.set_quantity("nope", "1"),
            Err(CoreError::LineNotFound("nope".to_string()))
        );
        assert!(cart.remove_line("nope").is_err());
    }

    #[test]
    fn test_patch_unit_price() {
        let mut cart = Cart::new();
        cart.add_product(&espresso(), Decimal::ONE).unwrap();
        assert!(cart.patch_unit_price("P1", Money::from_cents(1250)));
        assert!(!cart.patch_unit_price("P9", Money::from_cents(1250)));
        assert_eq!(cart.totals().net_total.cents(), 1250);
    }

    #[test]
    fn test_clear_resets_lines_and_global_discount() {
        let mut cart = scenario_cart();
        cart.set_global_discount("2", DiscountType::Amount).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.global_discount().is_none());
        assert_eq!(cart.totals(), TransactionTotals::default());
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            let p = ProductRef::new(format!("P{}", i), "Item", "pcs");
            cart.add_product(&p, Decimal::ONE).unwrap();
        }
        let extra = ProductRef::new("overflow", "Item", "pcs");
        assert_eq!(
            cart.add_product(&extra, Decimal::ONE),
            Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES
            })
        );
    }

    #[test]
    fn test_bridged_totals_are_snapshot_verbatim() {
        let source = CartSource::Bridged(snapshot());
        let totals = source.totals();
        assert_eq!(totals.subtotal.cents(), 4200);
        assert_eq!(totals.line_discount_total.cents(), 700);
        assert_eq!(totals.global_discount_total, Money::zero());
        assert_eq!(totals.net_total.cents(), 3500);
    }

    #[test]
    fn test_bridged_source_refuses_mutation() {
        let mut source = CartSource::Bridged(snapshot());
        assert_eq!(
            source.cart_mut("add product").unwrap_err(),
            CoreError::ModeExclusive {
                operation: "add product"
            }
        );
        assert_eq!(source.bridged_order_id(), Some("ORD-1"));
        assert!(source.cart().is_none());
    }

    #[test]
    fn test_huge_prices_saturate_instead_of_overflowing() {
        let mut cart = Cart::new();
        cart.add_product(&espresso(), Decimal::ONE).unwrap();
        cart.add_product(&ProductRef::new("P2", "Tea", "pcs"), Decimal::ONE)
            .unwrap();
        cart.set_unit_price("P1", "1e17").unwrap();
        cart.set_unit_price("P2", "1e17").unwrap();

        let totals = cart.totals();
        assert_eq!(totals.subtotal.cents(), i64::MAX);
        assert_eq!(totals.net_total.cents(), i64::MAX);

        cart.set_global_discount("1e20", DiscountType::Amount).unwrap();
        assert_eq!(cart.totals().net_total, Money::zero());
    }

    #[test]
    fn test_merged_quantity_overflow_rejected() {
        let mut cart = Cart::new();
        cart.add_product(&espresso(), Decimal::MAX).unwrap();

        let err = cart.add_product(&espresso(), Decimal::MAX).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(cart.line("P1").map(|l| l.qty), Some(Decimal::MAX));
    }
}
