//! # Checkout Events
//!
//! Notification seam between the engine and whatever shell hosts it.
//!
//! ```text
//! Checkout::submit ──success──► settlement_completed(receipt)
//!        │                      refresh_reports()
//!        │                      refresh_kitchen_feed()   (kitchen orders only)
//!        │
//!        └──terminal failure──► checkout_failed(message)
//! ```

use crate::checkout::SettlementReceipt;

/// Receives checkout notifications (implemented by the UI shell or CLI).
pub trait CheckoutEventEmitter: Send + Sync {
    /// A settlement was accepted by the transaction service.
    fn settlement_completed(&self, receipt: &SettlementReceipt);

    /// A checkout attempt ended in a terminal failure.
    fn checkout_failed(&self, message: &str);

    /// Reporting data is stale and should be reloaded.
    fn refresh_reports(&self);

    /// The open-order feed is stale and should be reloaded.
    fn refresh_kitchen_feed(&self);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl CheckoutEventEmitter for NoOpEmitter {
    fn settlement_completed(&self, _receipt: &SettlementReceipt) {}
    fn checkout_failed(&self, _message: &str) {}
    fn refresh_reports(&self) {}
    fn refresh_kitchen_feed(&self) {}
}
