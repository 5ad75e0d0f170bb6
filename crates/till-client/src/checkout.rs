//! # Checkout Submission Orchestrator
//!
//! Owns the active transaction source and payment ledger, builds settlement
//! payloads and interprets what the transaction service answers.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout::submit()                               │
//! │                                                                         │
//! │  phase == Pending? ──yes──► AlreadyInFlight (no-op)                     │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  phase = Pending(token)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Local checks: empty cart, |payments − net_total| ≤ tolerance           │
//! │       │            └── fail → error, NO network call                    │
//! │       ▼                                                                 │
//! │  Snapshot payload (value copy, later cart edits do not leak in)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  POST /settlements  or  POST /kitchen/orders/{id}/mark-paid             │
//! │       │                                                                 │
//! │       ├── ok ─────────────────────► reset source, receipt, events      │
//! │       ├── missing_selling_price ──► PriceRecoveryRequired (ad-hoc)     │
//! │       ├── stock_insufficient ─────► StockInsufficient (terminal)       │
//! │       ├── payment_total_mismatch ─► PaymentMismatch (ledger kept)      │
//! │       └── anything else ──────────► SettlementFailed / transport       │
//! │                                                                         │
//! │  phase = Idle (guard drop, also on early return)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stale Results
//! Every change of transaction source bumps a generation counter. A response
//! that arrives after the operator reset the cart or left KDS mode still
//! produces its outcome, but never mutates the new source.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use till_core::{
    CartSource, CoreError, CoreResult, DiscountType, Money, PaymentLedger, PaymentMethod,
    ProductRef, TransactionTotals,
};

use crate::config::CheckoutSettings;
use crate::error::{ClientError, ClientResult};
use crate::events::{CheckoutEventEmitter, NoOpEmitter};
use crate::protocol::{MarkPaidRequest, PaymentPayload, RejectionCode, SettlementRequest};
use crate::recovery::PriceRecovery;
use crate::service::TransactionService;

// =============================================================================
// Outcomes
// =============================================================================

/// Where a settlement came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "order_id", rename_all = "snake_case")]
pub enum SettlementOrigin {
    AdHoc,
    KitchenOrder(String),
}

/// Proof of an accepted settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    /// Token of the submission attempt that produced this receipt.
    pub token: Uuid,
    pub origin: SettlementOrigin,
    pub net_total: Money,
    pub tendered: Money,
    pub change_due: Money,
    pub settled_at: DateTime<Utc>,
}

/// Non-error result of a submission.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// The transaction service accepted the settlement.
    Settled(SettlementReceipt),
    /// Some products have no selling price; prices must be entered.
    PriceRecoveryRequired(PriceRecovery),
    /// A submission is already outstanding; nothing was sent.
    AlreadyInFlight,
    /// The price recovery was already completed, or the transaction it
    /// belongs to was reset or replaced. Nothing was sent.
    RecoveryStale,
}

/// Submission phase owned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Pending(Uuid),
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Default)]
pub(crate) struct CheckoutState {
    pub(crate) source: CartSource,
    pub(crate) ledger: PaymentLedger,
    pub(crate) note: Option<String>,
    pub(crate) generation: u64,
    pub(crate) submission: SubmissionPhase,
    /// Token of the attempt whose price recovery is still open.
    pub(crate) open_recovery: Option<Uuid>,
}

impl CheckoutState {
    /// Back to an empty ad-hoc cart with a fresh ledger.
    pub(crate) fn reset_to_ad_hoc(&mut self) {
        self.source = CartSource::default();
        self.ledger = PaymentLedger::new();
        self.note = None;
        self.generation += 1;
        self.open_recovery = None;
    }
}

/// Context captured when a submission is prepared.
#[derive(Debug, Clone)]
pub(crate) struct AttemptContext {
    pub(crate) token: Uuid,
    pub(crate) generation: u64,
    pub(crate) origin: SettlementOrigin,
    pub(crate) net_total: Money,
    pub(crate) tendered: Money,
}

pub(crate) enum PreparedPayload {
    AdHoc(SettlementRequest),
    KitchenOrder {
        order_id: String,
        request: MarkPaidRequest,
    },
}

/// Resets the submission phase to idle when dropped.
pub(crate) struct SubmissionGuard {
    state: Arc<Mutex<CheckoutState>>,
    pub(crate) token: Uuid,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.submission == SubmissionPhase::Pending(self.token) {
            state.submission = SubmissionPhase::Idle;
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// The checkout engine for one till.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Checkout {
    pub(crate) service: Arc<dyn TransactionService>,
    pub(crate) emitter: Arc<dyn CheckoutEventEmitter>,
    tolerance: Money,
    fallback_message: Arc<str>,
    pub(crate) state: Arc<Mutex<CheckoutState>>,
}

impl Checkout {
    pub fn new(service: Arc<dyn TransactionService>, settings: &CheckoutSettings) -> Self {
        Self::with_emitter(service, settings, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        service: Arc<dyn TransactionService>,
        settings: &CheckoutSettings,
        emitter: Arc<dyn CheckoutEventEmitter>,
    ) -> Self {
        Checkout {
            service,
            emitter,
            tolerance: settings.tolerance(),
            fallback_message: Arc::from(settings.fallback_error_message.as_str()),
            state: Arc::new(Mutex::new(CheckoutState::default())),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CheckoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Cart Operations (ad-hoc mode only)
    // =========================================================================

    pub fn add_product(&self, product: &ProductRef, qty: Decimal) -> CoreResult<()> {
        self.lock()
            .source
            .cart_mut("add products")?
            .add_product(product, qty)
    }

    pub fn set_quantity(&self, product_id: &str, raw: &str) -> CoreResult<()> {
        self.lock()
            .source
            .cart_mut("edit quantities")?
            .set_quantity(product_id, raw)
    }

    pub fn set_unit_price(&self, product_id: &str, raw: &str) -> CoreResult<()> {
        self.lock()
            .source
            .cart_mut("edit prices")?
            .set_unit_price(product_id, raw)
    }

    pub fn set_line_discount(&self, product_id: &str, raw: &str, kind: DiscountType) -> CoreResult<()> {
        self.lock()
            .source
            .cart_mut("edit line discounts")?
            .set_line_discount(product_id, raw, kind)
    }

    pub fn set_global_discount(&self, raw: &str, kind: DiscountType) -> CoreResult<()> {
        self.lock()
            .source
            .cart_mut("edit the global discount")?
            .set_global_discount(raw, kind)
    }

    pub fn remove_line(&self, product_id: &str) -> CoreResult<()> {
        self.lock()
            .source
            .cart_mut("remove products")?
            .remove_line(product_id)
    }

    /// Empties the ad-hoc cart and resets payments.
    pub fn clear_cart(&self) -> CoreResult<()> {
        let mut state = self.lock();
        state.source.cart_mut("clear the cart")?;
        state.reset_to_ad_hoc();
        Ok(())
    }

    pub fn set_note(&self, note: Option<String>) {
        self.lock().note = note.filter(|n| !n.trim().is_empty());
    }

    // =========================================================================
    // Payment Operations
    // =========================================================================

    pub fn add_payment(&self, method: PaymentMethod, amount: &str) -> usize {
        self.lock().ledger.add(method, amount)
    }

    pub fn remove_payment(&self, index: usize) -> bool {
        self.lock().ledger.remove(index)
    }

    pub fn set_payment_method(&self, index: usize, method: PaymentMethod) -> bool {
        self.lock().ledger.set_method(index, method)
    }

    pub fn set_payment_amount(&self, index: usize, amount: &str) -> bool {
        self.lock().ledger.set_amount(index, amount)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn totals(&self) -> TransactionTotals {
        self.lock().source.totals()
    }

    pub fn source(&self) -> CartSource {
        self.lock().source.clone()
    }

    pub fn ledger(&self) -> PaymentLedger {
        self.lock().ledger.clone()
    }

    pub fn is_kds_mode(&self) -> bool {
        self.lock().source.is_bridged()
    }

    pub fn bridged_order_id(&self) -> Option<String> {
        self.lock().source.bridged_order_id().map(str::to_string)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.lock().submission, SubmissionPhase::Pending(_))
    }

    pub fn remaining(&self) -> Money {
        let state = self.lock();
        state.ledger.remaining(state.source.totals().net_total)
    }

    pub fn change_due(&self) -> Money {
        let state = self.lock();
        state.ledger.change_due(state.source.totals().net_total)
    }

    pub fn tolerance(&self) -> Money {
        self.tolerance
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submits the active transaction for settlement.
    pub async fn submit(&self) -> ClientResult<CheckoutOutcome> {
        let Some(guard) = self.begin_submission() else {
            debug!("Settlement already in flight, ignoring submit");
            return Ok(CheckoutOutcome::AlreadyInFlight);
        };

        let (attempt, payload) = match self.prepare(guard.token) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.report_failure(&err);
                return Err(err);
            }
        };

        let result = match &payload {
            PreparedPayload::AdHoc(request) => {
                info!(
                    token = %attempt.token,
                    items = request.items.len(),
                    net_total = %attempt.net_total,
                    "Submitting ad-hoc settlement"
                );
                self.service.settle(request).await
            }
            PreparedPayload::KitchenOrder { order_id, request } => {
                info!(
                    token = %attempt.token,
                    order_id = %order_id,
                    net_total = %attempt.net_total,
                    "Submitting kitchen order payment"
                );
                self.service.mark_paid(order_id, request).await
            }
        };

        let outcome = self.conclude(attempt, payload, result);
        drop(guard);
        outcome
    }

    /// Claims the submission phase, or `None` if one is already pending.
    pub(crate) fn begin_submission(&self) -> Option<SubmissionGuard> {
        let mut state = self.lock();
        if let SubmissionPhase::Pending(token) = state.submission {
            debug!(%token, "Submission pending");
            return None;
        }

        let token = Uuid::new_v4();
        state.submission = SubmissionPhase::Pending(token);
        Some(SubmissionGuard {
            state: Arc::clone(&self.state),
            token,
        })
    }

    /// Runs local checks and snapshots the payload.
    fn prepare(&self, token: Uuid) -> ClientResult<(AttemptContext, PreparedPayload)> {
        let state = self.lock();
        let totals = state.source.totals();

        if let CartSource::AdHoc(cart) = &state.source {
            if cart.is_empty() {
                return Err(CoreError::EmptyCart.into());
            }
        }

        state
            .ledger
            .validate_against(totals.net_total, self.tolerance)
            .map_err(|err| {
                debug!(%err, "Payment reconciliation failed locally");
                ClientError::PaymentMismatch {
                    detail: err.to_string(),
                    local: true,
                }
            })?;

        let payments = state.ledger.tendered();
        let tendered = state.ledger.total();

        let (origin, payload) = match &state.source {
            CartSource::AdHoc(cart) => (
                SettlementOrigin::AdHoc,
                PreparedPayload::AdHoc(SettlementRequest::from_cart(
                    cart,
                    payments,
                    state.note.clone(),
                )),
            ),
            CartSource::Bridged(snapshot) => (
                SettlementOrigin::KitchenOrder(snapshot.order_id.clone()),
                PreparedPayload::KitchenOrder {
                    order_id: snapshot.order_id.clone(),
                    request: MarkPaidRequest {
                        payments: payments.into_iter().map(PaymentPayload::from).collect(),
                    },
                },
            ),
        };

        let attempt = AttemptContext {
            token,
            generation: state.generation,
            origin,
            net_total: totals.net_total,
            tendered,
        };

        Ok((attempt, payload))
    }

    /// Interprets the service response for one attempt.
    pub(crate) fn conclude(
        &self,
        attempt: AttemptContext,
        payload: PreparedPayload,
        result: ClientResult<()>,
    ) -> ClientResult<CheckoutOutcome> {
        match result {
            Ok(()) => Ok(CheckoutOutcome::Settled(self.complete(attempt))),
            Err(ClientError::Rejected(rejection)) => {
                let best = rejection
                    .best_message()
                    .unwrap_or_else(|| self.fallback_message.to_string());

                let err = match (rejection.code, payload) {
                    (RejectionCode::MissingSellingPrice, PreparedPayload::AdHoc(request))
                        if !rejection.products.is_empty() =>
                    {
                        info!(
                            token = %attempt.token,
                            products = rejection.products.len(),
                            "Settlement needs missing selling prices"
                        );
                        self.lock().open_recovery = Some(attempt.token);
                        let recovery = PriceRecovery::new(request, rejection.products, attempt);
                        return Ok(CheckoutOutcome::PriceRecoveryRequired(recovery));
                    }
                    (RejectionCode::StockInsufficient, _) => {
                        ClientError::StockInsufficient { detail: best }
                    }
                    (RejectionCode::PaymentTotalMismatch, _) => {
                        ClientError::PaymentMismatch {
                            detail: best,
                            local: false,
                        }
                    }
                    _ => ClientError::SettlementFailed { message: best },
                };

                self.report_failure(&err);
                Err(err)
            }
            Err(err) => {
                self.report_failure(&err);
                Err(err)
            }
        }
    }

    /// Applies a successful settlement and notifies the shell.
    fn complete(&self, attempt: AttemptContext) -> SettlementReceipt {
        let receipt = SettlementReceipt {
            token: attempt.token,
            origin: attempt.origin,
            net_total: attempt.net_total,
            tendered: attempt.tendered,
            change_due: (attempt.tendered - attempt.net_total).floor_zero(),
            settled_at: Utc::now(),
        };

        {
            let mut state = self.lock();
            if state.generation == attempt.generation {
                state.reset_to_ad_hoc();
            } else {
                debug!(
                    token = %receipt.token,
                    "Transaction source changed during settlement, leaving it untouched"
                );
            }
        }

        info!(
            token = %receipt.token,
            net_total = %receipt.net_total,
            change_due = %receipt.change_due,
            "Settlement completed"
        );

        self.emitter.settlement_completed(&receipt);
        self.emitter.refresh_reports();
        if matches!(receipt.origin, SettlementOrigin::KitchenOrder(_)) {
            self.emitter.refresh_kitchen_feed();
        }

        receipt
    }

    pub(crate) fn report_failure(&self, err: &ClientError) {
        let message = err.user_message();
        warn!(error = %err, "Checkout failed");
        self.emitter.checkout_failed(&message);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
