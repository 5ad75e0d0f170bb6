//! # Validation Module
//!
//! Input validation utilities for Till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Cart edits                                                   │
//! │  ├── Malformed text reads as 0 (money::parse_amount)                   │
//! │  └── Negative values rejected (validate_non_negative)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Checkout orchestration                                       │
//! │  ├── Payment tolerance (payment::PaymentLedger)                        │
//! │  └── THIS MODULE: recovered prices, order IDs, reason text             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Transaction service                                          │
//! │  └── Authoritative re-validation, business rejections                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_order_id, validate_recovered_price};
//!
//! assert_eq!(validate_recovered_price("P1", "12,5").unwrap().cents(), 1250);
//! assert!(validate_recovered_price("P1", "0").is_err());
//! assert!(validate_order_id("  ").is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::{try_parse_amount, Money};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a kitchen order ID.
pub const MAX_ORDER_ID_LEN: usize = 64;

/// Maximum length of a cancellation reason text.
pub const MAX_REASON_TEXT_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a kitchen order ID and returns it trimmed.
pub fn validate_order_id(order_id: &str) -> ValidationResult<&str> {
    let order_id = order_id.trim();

    if order_id.is_empty() {
        return Err(ValidationError::Required {
            field: "order_id".to_string(),
        });
    }

    if order_id.len() > MAX_ORDER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "order_id".to_string(),
            max: MAX_ORDER_ID_LEN,
        });
    }

    Ok(order_id)
}

/// Normalizes a cancellation reason text.
///
/// ## Returns
/// `None` for missing or blank text, otherwise the trimmed text.
pub fn validate_reason_text(text: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if text.chars().count() > MAX_REASON_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: "reason_text".to_string(),
            max: MAX_REASON_TEXT_LEN,
        });
    }

    Ok(Some(text.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects negative edits to quantities, prices and discounts.
pub fn validate_non_negative(field: &str, value: Decimal) -> ValidationResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a selling price entered during missing-price recovery.
///
/// ## Rules
/// - Must be a number (either decimal separator)
/// - Must be greater than zero once rounded to the cent
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Settlement rejected: missing_selling_price [P1, P2]                    │
/// │                                                                         │
/// │  User enters: P1 = "12.5", P2 = "abc"                                  │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_recovered_price(..) ← THIS FUNCTION, once per product        │
/// │       │                                                                 │
/// │       ├── P2 not a number → InvalidAmount, NO price update is sent      │
/// │       │                                                                 │
/// │       └── all OK → one PATCH per product, then resubmit                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_recovered_price(product_id: &str, raw: &str) -> ValidationResult<Money> {
    let field = format!("selling price for {}", product_id);

    let value = try_parse_amount(raw).ok_or_else(|| ValidationError::InvalidAmount {
        field: field.clone(),
        raw: raw.trim().to_string(),
    })?;

    let price = Money::from_decimal(value);
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive { field });
    }

    Ok(price)
}

/// Validates a payment tolerance setting.
///
/// ## Rules
/// - Must be a number between 0.00 and 1.00
pub fn validate_tolerance(raw: &str) -> ValidationResult<Money> {
    let value = try_parse_amount(raw).ok_or_else(|| ValidationError::InvalidAmount {
        field: "payment_tolerance".to_string(),
        raw: raw.trim().to_string(),
    })?;

    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValidationError::OutOfRange {
            field: "payment_tolerance".to_string(),
            min: "0.00".to_string(),
            max: "1.00".to_string(),
        });
    }

    Ok(Money::from_decimal(value))
}

// =============================================================================
// Unit Tests
// =============================================================================
