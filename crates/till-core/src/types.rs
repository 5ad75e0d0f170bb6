//! # Domain Types
//!
//! Core domain types used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ProductRef    │   │    Discount     │   │  PaymentMethod  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  value (Dec)    │   │  Cash           │       │
//! │  │  name, unit     │   │  kind           │   │  Card, Cheque   │       │
//! │  │  selling_price? │   │  Amount|Percent │   │  MealVoucher    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌──────────────────────┐   ┌─────────────────┐   ┌────────────────┐   │
//! │  │ KitchenOrderSnapshot │   │ KitchenOrder    │   │ CancelReason   │   │
//! │  │  ──────────────────  │   │ Status          │   │ ────────────── │   │
//! │  │  order_id, lines     │   │  SENT → READY   │   │ cancelled      │   │
//! │  │  subtotal            │   │  READY → SERVED │   │ mistake        │   │
//! │  │  discount_total      │   │  → CANCELLED    │   │ breakage       │   │
//! │  │  total (authority)   │   │                 │   │ other (+text)  │   │
//! │  └──────────────────────┘   └─────────────────┘   └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::money::Money;

// =============================================================================
// Discounts
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Fixed amount off.
    #[default]
    Amount,
    /// Percentage of the base it applies to.
    Percent,
}

/// A discount as entered: a value plus how to read it.
///
/// Used both per line and once for the whole ad-hoc cart (the global discount).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Discount {
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(rename = "type")]
    pub kind: DiscountType,
}

impl Discount {
    /// No discount.
    pub const NONE: Discount = Discount {
        value: Decimal::ZERO,
        kind: DiscountType::Amount,
    };

    pub fn amount(value: Decimal) -> Self {
        Discount {
            value,
            kind: DiscountType::Amount,
        }
    }

    pub fn percent(value: Decimal) -> Self {
        Discount {
            value,
            kind: DiscountType::Percent,
        }
    }

    pub fn is_none(&self) -> bool {
        self.value.is_zero()
    }
}

/// Discount applied once to the whole ad-hoc cart.
pub type GlobalDiscount = Discount;

// =============================================================================
// Product Reference
// =============================================================================

/// The slice of a catalog product the cart needs.
///
/// Products without a selling price can be added; the transaction service
/// then rejects settlement with `missing_selling_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub selling_price: Option<Money>,
}

impl ProductRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        ProductRef {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            selling_price: None,
        }
    }

    pub fn with_selling_price(mut self, price: Money) -> Self {
        self.selling_price = Some(price);
        self
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    #[default]
    Cash,
    /// Card payment on external terminal.
    Card,
    Cheque,
    MealVoucher,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::MealVoucher => "meal_voucher",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "cheque" | "check" => Ok(PaymentMethod::Cheque),
            "meal_voucher" | "voucher" => Ok(PaymentMethod::MealVoucher),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

/// A tendered payment with its amount resolved to Money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub amount: Money,
}

// =============================================================================
// Kitchen Orders
// =============================================================================

/// Status of a kitchen order as reported by the kitchen ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenOrderStatus {
    /// Upstream pre-state; never reaches the till's open-order feed.
    Draft,
    /// Sent to the kitchen, in preparation.
    Sent,
    /// Ready to be served.
    Ready,
    /// Served to the table. **Terminal.**
    Served,
    /// Cancelled with a reason. **Terminal.**
    Cancelled,
}

impl fmt::Display for KitchenOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KitchenOrderStatus::Draft => "DRAFT",
            KitchenOrderStatus::Sent => "SENT",
            KitchenOrderStatus::Ready => "READY",
            KitchenOrderStatus::Served => "SERVED",
            KitchenOrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Mandatory reason code when cancelling a kitchen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Cancelled,
    Mistake,
    Breakage,
    /// Requires free text.
    Other,
}

/// One entry in the open-order feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenOrderSummary {
    pub order_id: String,
    #[serde(default)]
    pub table_label: Option<String>,
    pub status: KitchenOrderStatus,
    pub total: Money,
}

/// One line of a bridged kitchen order (display only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenOrderLine {
    pub menu_item_name: String,
    pub qty: Decimal,
    pub line_total: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Immutable, server-provided checkout view of a kitchen order.
///
/// ## Why Not Recompute?
/// The kitchen ledger may have comped items or applied discounts the till
/// never saw. Its totals are taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenOrderSnapshot {
    pub order_id: String,
    #[serde(default)]
    pub table_label: Option<String>,
    #[serde(default)]
    pub lines: Vec<KitchenOrderLine>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub total: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "meal_voucher".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::MealVoucher
        );
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::MealVoucher).unwrap();
        assert_eq!(json, "\"meal_voucher\"");
    }

    #[test]
    fn test_snapshot_accepts_string_and_number_amounts() {
        let json = r#"{
            "order_id": "ORD-9",
            "table_label": "T4",
            "lines": [
                {"menu_item_name": "Soup", "qty": "2", "line_total": "9,00", "notes": null}
            ],
            "subtotal": "9.00",
            "discount_total": 1,
            "total": 8.0
        }"#;
        let snapshot: KitchenOrderSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.subtotal, Money::from_cents(900));
        assert_eq!(snapshot.discount_total, Money::from_cents(100));
        assert_eq!(snapshot.total, Money::from_cents(800));
        assert_eq!(snapshot.lines[0].line_total, Money::from_cents(900));
    }

    #[test]
    fn test_status_wire_names() {
        let status: KitchenOrderStatus = serde_json::from_str("\"READY\"").unwrap();
        assert_eq!(status, KitchenOrderStatus::Ready);
        assert_eq!(KitchenOrderStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_discount_serializes_type_field() {
        let json = serde_json::to_value(Discount::amount(Decimal::from(2))).unwrap();
        assert_eq!(json["type"], "amount");
        assert_eq!(json["value"], 2.0);
    }
}
