//! # Transaction Service Protocol
//!
//! JSON message types exchanged with the remote transaction service.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST  /settlements                      SettlementRequest → {}         │
//! │  GET   /kitchen/open-orders              → [KitchenOrderSummary]        │
//! │  GET   /kitchen/orders/{id}/for-checkout → KitchenOrderSnapshot         │
//! │  POST  /kitchen/orders/{id}/mark-paid    MarkPaidRequest → {}           │
//! │  POST  /kitchen/orders/{id}/ready        → {}                           │
//! │  POST  /kitchen/orders/{id}/served       → {}                           │
//! │  POST  /kitchen/orders/{id}/cancel       CancelRequest → {}             │
//! │  PATCH /products/{id}                    PriceUpdateRequest → {}        │
//! │                                                                         │
//! │  Failure body: { code, detail, message?, products? }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary fields go out as JSON numbers and are read back from numbers or
//! decimal strings (see `till_core::Money`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use till_core::{Cart, CartLine, Discount, DiscountType, Money, Payment, PaymentMethod};

// =============================================================================
// Settlement Payloads
// =============================================================================

/// One ad-hoc cart line as sent for settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementItem {
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal,
    pub unit_price: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub discount_type: DiscountType,
}

impl From<&CartLine> for SettlementItem {
    fn from(line: &CartLine) -> Self {
        SettlementItem {
            product_id: line.product_id.clone(),
            qty: line.qty,
            unit_price: line.unit_price,
            discount: line.discount.value,
            discount_type: line.discount.kind,
        }
    }
}

/// One tendered payment on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPayload {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl From<Payment> for PaymentPayload {
    fn from(payment: Payment) -> Self {
        PaymentPayload {
            method: payment.method,
            amount: payment.amount,
        }
    }
}

/// Body of `POST /settlements`.
///
/// Built once per attempt and never re-read from the cart; a missing-price
/// retry resubmits this exact value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub items: Vec<SettlementItem>,
    pub payments: Vec<PaymentPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_discount: Option<Discount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SettlementRequest {
    /// Snapshots an ad-hoc cart and its tendered payments.
    pub fn from_cart(cart: &Cart, payments: Vec<Payment>, note: Option<String>) -> Self {
        let global = cart.global_discount();
        SettlementRequest {
            items: cart.lines().iter().map(SettlementItem::from).collect(),
            payments: payments.into_iter().map(PaymentPayload::from).collect(),
            global_discount: (!global.is_none()).then_some(global),
            note,
        }
    }
}

/// Body of `POST /kitchen/orders/{id}/mark-paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPaidRequest {
    pub payments: Vec<PaymentPayload>,
}

/// Body of `PATCH /products/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdateRequest {
    pub selling_price: Money,
}

// =============================================================================
// Rejections
// =============================================================================

/// Error codes with a defined client reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionCode {
    MissingSellingPrice,
    StockInsufficient,
    PaymentTotalMismatch,
    Other(String),
}

impl RejectionCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "missing_selling_price" => RejectionCode::MissingSellingPrice,
            "stock_insufficient" => RejectionCode::StockInsufficient,
            "payment_total_mismatch" => RejectionCode::PaymentTotalMismatch,
            other => RejectionCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RejectionCode::MissingSellingPrice => "missing_selling_price",
            RejectionCode::StockInsufficient => "stock_insufficient",
            RejectionCode::PaymentTotalMismatch => "payment_total_mismatch",
            RejectionCode::Other(code) => code,
        }
    }
}

/// A product the service could not price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPriceProduct {
    #[serde(alias = "id")]
    pub product_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw failure body. Accepts both the flat form and `{ "detail": { ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub products: Vec<MissingPriceProduct>,
}

impl ErrorBody {
    /// Interprets the body as a rejection; `None` when it carries no code.
    pub fn into_rejection(self, status: u16) -> Option<ServiceRejection> {
        let ErrorBody {
            code,
            detail,
            message,
            products,
        } = self;

        let (code, detail) = match (code, detail) {
            (Some(code), detail) => (code, detail),
            (None, Some(nested @ serde_json::Value::Object(_))) => {
                let mut nested: ErrorBody = serde_json::from_value(nested).ok()?;
                nested.message = nested.message.or(message);
                if nested.products.is_empty() {
                    nested.products = products;
                }
                return nested.into_rejection(status);
            }
            (None, _) => return None,
        };

        let detail = match detail {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Some(ServiceRejection {
            status,
            code: RejectionCode::parse(&code),
            detail: detail.filter(|d| !d.trim().is_empty()),
            message: message.filter(|m| !m.trim().is_empty()),
            products,
        })
    }
}

/// A business-rule rejection reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRejection {
    pub status: u16,
    pub code: RejectionCode,
    pub detail: Option<String>,
    pub message: Option<String>,
    pub products: Vec<MissingPriceProduct>,
}

impl ServiceRejection {
    /// Best server-provided text: `detail`, then `message`.
    pub fn best_message(&self) -> Option<String> {
        self.detail.clone().or_else(|| self.message.clone())
    }
}

impl fmt::Display for ServiceRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best_message() {
            Some(msg) => write!(f, "{} ({})", self.code.as_str(), msg),
            None => f.write_str(self.code.as_str()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
