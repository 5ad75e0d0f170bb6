//! # Transaction Service Seam
//!
//! The remote transaction service owns stock decrement, ledger persistence
//! and tax authority. The engine only talks to it through this trait, so the
//! orchestrator and kitchen board can be driven by a scripted fake in tests.

use async_trait::async_trait;
use till_core::{CancelRequest, KitchenOrderSnapshot, KitchenOrderSummary, Money};

use crate::error::ClientResult;
use crate::protocol::{MarkPaidRequest, SettlementRequest};

/// Remote operations used by the checkout engine.
///
/// Business rejections come back as `ClientError::Rejected`; transport
/// failures as the transport variants.
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// `POST /settlements`
    async fn settle(&self, request: &SettlementRequest) -> ClientResult<()>;

    /// `GET /kitchen/open-orders`
    async fn open_kitchen_orders(&self) -> ClientResult<Vec<KitchenOrderSummary>>;

    /// `GET /kitchen/orders/{id}/for-checkout`
    async fn kitchen_order_for_checkout(&self, order_id: &str)
        -> ClientResult<KitchenOrderSnapshot>;

    /// `POST /kitchen/orders/{id}/mark-paid`
    async fn mark_paid(&self, order_id: &str, request: &MarkPaidRequest) -> ClientResult<()>;

    /// `POST /kitchen/orders/{id}/ready`
    async fn mark_ready(&self, order_id: &str) -> ClientResult<()>;

    /// `POST /kitchen/orders/{id}/served`
    async fn mark_served(&self, order_id: &str) -> ClientResult<()>;

    /// `POST /kitchen/orders/{id}/cancel`
    async fn cancel_order(&self, order_id: &str, request: &CancelRequest) -> ClientResult<()>;

    /// `PATCH /products/{id}`
    async fn update_selling_price(&self, product_id: &str, price: Money) -> ClientResult<()>;
}
