//! # till-core: Pure Checkout Logic for Till
//!
//! This crate is the arithmetic and rule layer of the checkout engine. It
//! contains every calculation and every state rule as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-cli / UI shell                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       till-client (bridge, orchestrator, recovery, polling)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ pricing │ │  cart   │ │ payment │ │ kitchen │  │   │
//! │  │   │ parse / │ │  line   │ │ totals  │ │ ledger  │ │ status  │  │   │
//! │  │   │ format  │ │ clamps  │ │ source  │ │ tol.    │ │ machine │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TIMERS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type, amount parsing and formatting
//! - [`types`] - Domain types (discounts, payment methods, kitchen orders)
//! - [`pricing`] - Line pricing calculator
//! - [`cart`] - Ad-hoc cart, cart source and transaction totals
//! - [`payment`] - Payment ledger and reconciliation
//! - [`kitchen`] - Kitchen order status transitions
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use till_core::cart::Cart;
//! use till_core::types::{DiscountType, ProductRef};
//!
//! let mut cart = Cart::new();
//! let espresso = ProductRef::new("P1", "Espresso", "pcs");
//! cart.add_product(&espresso, Decimal::from(2)).unwrap();
//! cart.set_unit_price("P1", "10,00").unwrap();
//! cart.set_line_discount("P1", "5", DiscountType::Percent).unwrap();
//!
//! assert_eq!(cart.totals().net_total.to_string(), "19.00");
//! ```

pub mod cart;
pub mod error;
pub mod kitchen;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartSource, TransactionTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use kitchen::{validate_transition, CancelRequest, KitchenTransition};
pub use money::{format_amount, parse_amount, Money};
pub use payment::{PaymentEntry, PaymentLedger};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Allowed absolute deviation between tendered payments and the amount due.
///
/// ## Why a constant?
/// Two-decimal currencies settle to the cent. Deployments in currencies with
/// a different minor unit override this through the client configuration.
pub const PAYMENT_TOLERANCE: Money = Money::from_cents(1);

/// Maximum distinct lines allowed in a single ad-hoc cart.
pub const MAX_CART_LINES: usize = 100;
