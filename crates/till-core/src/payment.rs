//! # Payment Ledger
//!
//! Collects tendered payments as free text and reconciles them against the
//! amount due.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entries: [cash "10,00"] [card "7"]                                     │
//! │                │                                                        │
//! │                ▼ parse_amount                                           │
//! │  total() = 17.00                                                        │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  |total − net_total| ≤ tolerance ?                                      │
//! │       ├── yes → settlement may be submitted                             │
//! │       └── no  → PaymentMismatch, no network call                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Payment, PaymentMethod};

/// One row of the payment ledger, amount as typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub method: PaymentMethod,
    pub amount: String,
}

impl PaymentEntry {
    pub fn new(method: PaymentMethod, amount: impl Into<String>) -> Self {
        PaymentEntry {
            method,
            amount: amount.into(),
        }
    }

    /// Parsed amount; malformed text reads as zero.
    pub fn parsed_amount(&self) -> Money {
        Money::parse(&self.amount)
    }
}

/// Ordered list of tendered payments. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLedger {
    entries: Vec<PaymentEntry>,
}

impl Default for PaymentLedger {
    fn default() -> Self {
        PaymentLedger {
            entries: vec![PaymentEntry::default()],
        }
    }
}

impl PaymentLedger {
    /// A ledger with one cash entry and an empty amount.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger with a single pre-filled entry.
    pub fn seeded(method: PaymentMethod, amount: Money) -> Self {
        PaymentLedger {
            entries: vec![PaymentEntry::new(method, amount.to_string())],
        }
    }

    pub fn entries(&self) -> &[PaymentEntry] {
        &self.entries
    }

    /// Appends a row and returns its index.
    pub fn add(&mut self, method: PaymentMethod, amount: impl Into<String>) -> usize {
        self.entries.push(PaymentEntry::new(method, amount));
        self.entries.len() - 1
    }

    /// Removes a row. The last remaining row is kept.
    ///
    /// Returns `false` if nothing was removed.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.entries.len() <= 1 || index >= self.entries.len() {
            return false;
        }
        self.entries.remove(index);
        true
    }

    pub fn set_method(&mut self, index: usize, method: PaymentMethod) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.method = method;
                true
            }
            None => false,
        }
    }

    pub fn set_amount(&mut self, index: usize, amount: impl Into<String>) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.amount = amount.into();
                true
            }
            None => false,
        }
    }

    /// Sum of all parsed amounts.
    pub fn total(&self) -> Money {
        self.entries.iter().map(PaymentEntry::parsed_amount).sum()
    }

    /// Resolved payments in entry order.
    pub fn tendered(&self) -> Vec<Payment> {
        self.entries
            .iter()
            .map(|e| Payment {
                method: e.method,
                amount: e.parsed_amount(),
            })
            .collect()
    }

    /// Amount still to collect, floored at zero.
    pub fn remaining(&self, net_total: Money) -> Money {
        (net_total - self.total()).floor_zero()
    }

    /// Change owed back to the customer, floored at zero.
    pub fn change_due(&self, net_total: Money) -> Money {
        (self.total() - net_total).floor_zero()
    }

    /// Checks `|total − net_total| ≤ tolerance`.
    pub fn validate_against(&self, net_total: Money, tolerance: Money) -> CoreResult<()> {
        let tendered = self.total();
        let difference = (tendered - net_total).abs();

        if difference > tolerance {
            return Err(CoreError::PaymentMismatch {
                expected: net_total,
                tendered,
                difference,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
