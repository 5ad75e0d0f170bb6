//! # Kitchen Order State Machine
//!
//! Local guard over kitchen order transitions. The transaction service is the
//! enforcement authority; this module only refuses requests that the last
//! known status already rules out.
//!
//! ## Transitions
//! ```text
//!            mark_ready          mark_served
//!   SENT ───────────────► READY ─────────────► SERVED (terminal)
//!     │                     │
//!     │ cancel(reason)      │ cancel(reason)
//!     ▼                     ▼
//!   CANCELLED (terminal) ◄──┘
//!
//!   DRAFT never reaches the till; it permits nothing.
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{CancelReason, KitchenOrderStatus};
use crate::validation::validate_reason_text;

impl KitchenOrderStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, KitchenOrderStatus::Served | KitchenOrderStatus::Cancelled)
    }

    /// Whether the order may move to `next`.
    pub fn can_transition_to(&self, next: KitchenOrderStatus) -> bool {
        use KitchenOrderStatus::*;
        matches!(
            (*self, next),
            (Sent, Ready) | (Ready, Served) | (Sent, Cancelled) | (Ready, Cancelled)
        )
    }
}

/// A validated cancellation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub reason_code: CancelReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_text: Option<String>,
}

impl CancelRequest {
    /// Builds a cancellation request.
    ///
    /// ## Rules
    /// - A reason code is mandatory
    /// - `other` additionally requires non-blank text
    pub fn new(reason_code: Option<CancelReason>, reason_text: Option<&str>) -> CoreResult<Self> {
        let reason_code = reason_code.ok_or(CoreError::CancelReasonRequired)?;
        let reason_text = validate_reason_text(reason_text)?;

        if reason_code == CancelReason::Other && reason_text.is_none() {
            return Err(CoreError::CancelReasonTextRequired);
        }

        Ok(CancelRequest {
            reason_code,
            reason_text,
        })
    }
}

/// A requested kitchen order transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitchenTransition {
    MarkReady,
    MarkServed,
    Cancel(CancelRequest),
}

impl KitchenTransition {
    pub fn target(&self) -> KitchenOrderStatus {
        match self {
            KitchenTransition::MarkReady => KitchenOrderStatus::Ready,
            KitchenTransition::MarkServed => KitchenOrderStatus::Served,
            KitchenTransition::Cancel(_) => KitchenOrderStatus::Cancelled,
        }
    }
}

/// Checks a transition against the order's last known status.
///
/// Returns the target status when permitted.
pub fn validate_transition(
    order_id: &str,
    current: KitchenOrderStatus,
    transition: &KitchenTransition,
) -> CoreResult<KitchenOrderStatus> {
    let target = transition.target();

    if !current.can_transition_to(target) {
        return Err(CoreError::IllegalTransition {
            order_id: order_id.to_string(),
            from: current,
            to: target,
        });
    }

    Ok(target)
}

// =============================================================================
// Unit Tests
// =============================================================================
