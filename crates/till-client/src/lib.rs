//! # till-client: Checkout Engine for Till
//!
//! This crate drives checkout against the remote transaction service: it
//! owns the active transaction source, reconciles payments, settles ad-hoc
//! carts and kitchen orders, recovers from missing selling prices and keeps
//! the open-order feed fresh.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Engine                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    Checkout (orchestrator)                       │  │
//! │  │                                                                  │  │
//! │  │  CartSource = AdHoc(cart) | Bridged(snapshot)                    │  │
//! │  │  PaymentLedger, in-flight guard, generation counter              │  │
//! │  └───────┬───────────────────────┬──────────────────────┬───────────┘  │
//! │          ▼                       ▼                      ▼              │
//! │  ┌────────────────┐  ┌──────────────────────┐  ┌──────────────────┐    │
//! │  │ bridge         │  │ recovery             │  │ events           │    │
//! │  │                │  │                      │  │                  │    │
//! │  │ enter/exit     │  │ PATCH prices, then   │  │ settled, failed, │    │
//! │  │ KDS mode       │  │ resubmit once        │  │ refresh hints    │    │
//! │  └────────────────┘  └──────────────────────┘  └──────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────────────────┐   ┌────────────────────────────────┐   │
//! │  │ kitchen                    │   │ TransactionService (trait)     │   │
//! │  │                            │   │                                │   │
//! │  │ KitchenBoard transitions   │──►│ HttpTransactionService         │   │
//! │  │ KitchenFeedPoller (2.5s)   │   │ reqwest + tenant header        │   │
//! │  │ KitchenView lifecycle      │   │                                │   │
//! │  └────────────────────────────┘   └────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`checkout`] - Submission orchestrator and settlement receipts
//! - [`bridge`] - KDS mode (kitchen order bridging)
//! - [`recovery`] - Missing selling price recovery
//! - [`kitchen`] - Kitchen board, feed poller and view lifecycle
//! - [`service`] - Transaction service trait
//! - [`http`] - HTTP implementation of the transaction service
//! - [`protocol`] - Wire payloads and rejection decoding
//! - [`config`] - TOML configuration with environment overrides
//! - [`events`] - Event emitter seam
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Client error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use till_client::{Checkout, CheckoutOutcome, ClientConfig, HttpTransactionService};
//!
//! let config = ClientConfig::load_or_default(None);
//! let service = Arc::new(HttpTransactionService::new(&config.service)?);
//! let checkout = Checkout::new(service, &config.checkout);
//!
//! checkout.enter_kds_mode("ORD-42").await?;
//! match checkout.submit().await? {
//!     CheckoutOutcome::Settled(receipt) => println!("Paid {}", receipt.net_total),
//!     CheckoutOutcome::PriceRecoveryRequired(_) => unreachable!(),
//!     CheckoutOutcome::AlreadyInFlight | CheckoutOutcome::RecoveryStale => {}
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bridge;
pub mod checkout;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod kitchen;
pub mod protocol;
pub mod recovery;
pub mod service;
pub mod telemetry;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{Checkout, CheckoutOutcome, SettlementOrigin, SettlementReceipt, SubmissionPhase};
pub use config::{CheckoutSettings, ClientConfig, KitchenSettings, ServiceSettings};
pub use error::{ClientError, ClientResult};
pub use events::{CheckoutEventEmitter, NoOpEmitter};
pub use http::HttpTransactionService;
pub use kitchen::{FeedStatus, KitchenBoard, KitchenFeedPoller, KitchenFeedPollerHandle, KitchenView, TransitionOutcome};
pub use protocol::{RejectionCode, ServiceRejection, SettlementRequest};
pub use recovery::PriceRecovery;
pub use service::TransactionService;
