//! Scripted in-memory transaction service and recording emitter for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use till_core::{CancelRequest, KitchenOrderSnapshot, KitchenOrderStatus, KitchenOrderSummary, Money};

use crate::checkout::SettlementReceipt;
use crate::error::{ClientError, ClientResult};
use crate::events::CheckoutEventEmitter;
use crate::protocol::{ErrorBody, MarkPaidRequest, MissingPriceProduct, SettlementRequest};
use crate::service::TransactionService;

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Settle(SettlementRequest),
    OpenOrders,
    ForCheckout(String),
    MarkPaid(String, MarkPaidRequest),
    Ready(String),
    Served(String),
    Cancel(String, CancelRequest),
    UpdatePrice(String, Money),
}

/// Scripted fake. Every call is recorded; queued responses are consumed in
/// order and an empty queue answers `Ok`.
#[derive(Default)]
pub struct FakeService {
    calls: Mutex<Vec<Call>>,
    settle_results: Mutex<VecDeque<ClientResult<()>>>,
    mark_paid_results: Mutex<VecDeque<ClientResult<()>>>,
    transition_results: Mutex<VecDeque<ClientResult<()>>>,
    price_results: Mutex<HashMap<String, VecDeque<ClientResult<()>>>>,
    feed_failures: Mutex<VecDeque<ClientError>>,
    orders: Mutex<Vec<KitchenOrderSummary>>,
    snapshots: Mutex<HashMap<String, KitchenOrderSnapshot>>,
    settle_gate: Mutex<Option<Arc<Notify>>>,
    feed_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn settle_calls(&self) -> Vec<SettlementRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Settle(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn push_settle(&self, result: ClientResult<()>) {
        self.settle_results.lock().unwrap().push_back(result);
    }

    pub fn push_mark_paid(&self, result: ClientResult<()>) {
        self.mark_paid_results.lock().unwrap().push_back(result);
    }

    pub fn push_transition(&self, result: ClientResult<()>) {
        self.transition_results.lock().unwrap().push_back(result);
    }

    pub fn push_price_update(&self, product_id: &str, result: ClientResult<()>) {
        self.price_results
            .lock()
            .unwrap()
            .entry(product_id.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_feed_failure(&self, err: ClientError) {
        self.feed_failures.lock().unwrap().push_back(err);
    }

    pub fn set_orders(&self, orders: Vec<KitchenOrderSummary>) {
        *self.orders.lock().unwrap() = orders;
    }

    pub fn add_snapshot(&self, snapshot: KitchenOrderSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.order_id.clone(), snapshot);
    }

    /// Holds every settlement response until the returned notify fires.
    pub fn gate_settlements(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.settle_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Holds every feed response until the returned notify fires.
    pub fn gate_feed(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.feed_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(queue: &Mutex<VecDeque<ClientResult<()>>>) -> ClientResult<()> {
        queue.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    fn set_status(&self, order_id: &str, status: KitchenOrderStatus) {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders.iter_mut().find(|o| o.order_id == order_id) {
            order.status = status;
        }
    }

    fn transition(&self, order_id: &str, status: KitchenOrderStatus) -> ClientResult<()> {
        let result = Self::next(&self.transition_results);
        if result.is_ok() {
            self.set_status(order_id, status);
        }
        result
    }
}

#[async_trait]
impl TransactionService for FakeService {
    async fn settle(&self, request: &SettlementRequest) -> ClientResult<()> {
        self.record(Call::Settle(request.clone()));
        let gate = self.settle_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Self::next(&self.settle_results)
    }

    async fn open_kitchen_orders(&self) -> ClientResult<Vec<KitchenOrderSummary>> {
        self.record(Call::OpenOrders);
        let gate = self.feed_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.feed_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn kitchen_order_for_checkout(
        &self,
        order_id: &str,
    ) -> ClientResult<KitchenOrderSnapshot> {
        self.record(Call::ForCheckout(order_id.to_string()));
        self.snapshots
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| rejection(404, "not_found", "Order not found"))
    }

    async fn mark_paid(&self, order_id: &str, request: &MarkPaidRequest) -> ClientResult<()> {
        self.record(Call::MarkPaid(order_id.to_string(), request.clone()));
        Self::next(&self.mark_paid_results)
    }

    async fn mark_ready(&self, order_id: &str) -> ClientResult<()> {
        self.record(Call::Ready(order_id.to_string()));
        self.transition(order_id, KitchenOrderStatus::Ready)
    }

    async fn mark_served(&self, order_id: &str) -> ClientResult<()> {
        self.record(Call::Served(order_id.to_string()));
        self.transition(order_id, KitchenOrderStatus::Served)
    }

    async fn cancel_order(&self, order_id: &str, request: &CancelRequest) -> ClientResult<()> {
        self.record(Call::Cancel(order_id.to_string(), request.clone()));
        self.transition(order_id, KitchenOrderStatus::Cancelled)
    }

    async fn update_selling_price(&self, product_id: &str, price: Money) -> ClientResult<()> {
        self.record(Call::UpdatePrice(product_id.to_string(), price));
        self.price_results
            .lock()
            .unwrap()
            .get_mut(product_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

/// Builds a service rejection the way the HTTP client would.
pub fn rejection(status: u16, code: &str, detail: &str) -> ClientError {
    build_rejection(status, code, detail, Vec::new())
}

/// `missing_selling_price` rejection for the given product IDs.
pub fn missing_price(product_ids: &[&str]) -> ClientError {
    let products = product_ids
        .iter()
        .map(|id| MissingPriceProduct {
            product_id: id.to_string(),
            name: None,
        })
        .collect();
    build_rejection(422, "missing_selling_price", "Missing selling price", products)
}

fn build_rejection(
    status: u16,
    code: &str,
    detail: &str,
    products: Vec<MissingPriceProduct>,
) -> ClientError {
    let body = ErrorBody {
        code: Some(code.to_string()),
        detail: Some(serde_json::Value::String(detail.to_string())),
        message: None,
        products,
    };
    match body.into_rejection(status) {
        Some(rejection) => ClientError::Rejected(rejection),
        None => ClientError::Internal("unreachable rejection".into()),
    }
}

pub fn summary(order_id: &str, status: KitchenOrderStatus) -> KitchenOrderSummary {
    KitchenOrderSummary {
        order_id: order_id.to_string(),
        table_label: Some("T1".to_string()),
        status,
        total: Money::from_cents(3550),
    }
}

pub fn snapshot(order_id: &str, total_cents: i64) -> KitchenOrderSnapshot {
    KitchenOrderSnapshot {
        order_id: order_id.to_string(),
        table_label: Some("T1".to_string()),
        lines: Vec::new(),
        subtotal: Money::from_cents(total_cents + 500),
        discount_total: Money::from_cents(500),
        total: Money::from_cents(total_cents),
    }
}

/// Emitter that records every notification as a short string.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<String>>,
}

impl RecordingEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl CheckoutEventEmitter for RecordingEmitter {
    fn settlement_completed(&self, receipt: &SettlementReceipt) {
        self.events
            .lock()
            .unwrap()
            .push(format!("settled:{}", receipt.net_total));
    }

    fn checkout_failed(&self, message: &str) {
        self.events.lock().unwrap().push(format!("failed:{}", message));
    }

    fn refresh_reports(&self) {
        self.events.lock().unwrap().push("refresh_reports".into());
    }

    fn refresh_kitchen_feed(&self) {
        self.events.lock().unwrap().push("refresh_kitchen_feed".into());
    }
}
