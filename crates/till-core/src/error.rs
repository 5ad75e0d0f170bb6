//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Checkout rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-client errors (separate crate)                                   │
//! │  └── ClientError      - Transport, rejection, and config failures      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → user message        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::KitchenOrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Checkout rule violations.
///
/// These are detected locally, before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A cart mutation was attempted while a kitchen order is bridged.
    ///
    /// ## When This Occurs
    /// ```text
    /// enter_kds_mode("ORD-7")
    ///      │
    ///      ▼
    /// add_product(...)  ← cart is frozen
    ///      │
    ///      ▼
    /// ModeExclusive { operation: "add product" }
    /// ```
    #[error("Cannot {operation} while a kitchen order is being settled")]
    ModeExclusive { operation: &'static str },

    /// Cart line not found.
    #[error("Product {0} is not in the cart")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Ad-hoc settlement attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Tendered payments do not add up to the amount due.
    #[error("Payments total {tendered} but {expected} is due (difference {difference})")]
    PaymentMismatch {
        expected: Money,
        tendered: Money,
        difference: Money,
    },

    /// Kitchen order is not part of the last known open-order feed.
    #[error("Kitchen order {0} not found")]
    OrderNotFound(String),

    /// Kitchen order status does not permit the requested transition.
    #[error("Kitchen order {order_id} is {from}, cannot move to {to}")]
    IllegalTransition {
        order_id: String,
        from: KitchenOrderStatus,
        to: KitchenOrderStatus,
    },

    /// Cancellation requested without a reason code.
    #[error("A reason is required to cancel an order")]
    CancelReasonRequired,

    /// Cancellation with reason `other` requested without free text.
    #[error("Describe the reason when cancelling with 'other'")]
    CancelReasonTextRequired,

    /// A field-level input check failed.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level input failures from cart edits, recovered prices and
/// cancellation reasons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank where text is mandatory.
    #[error("{field} is required")]
    Required { field: String },

    /// Text longer than the field allows.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Value is not a number.
    #[error("{field} is not a valid amount: '{raw}'")]
    InvalidAmount { field: String, raw: String },

    /// Outside an inclusive numeric bound.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: String, max: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result of a checkout rule check.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
