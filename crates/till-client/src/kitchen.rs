//! # Kitchen Board
//!
//! Open-order feed, kitchen status transitions, and the feed poller.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kitchen Board                                  │
//! │                                                                         │
//! │  KitchenView ──mount/unmount/feature flag──► KitchenFeedPoller          │
//! │                                                   │ every 2.5s          │
//! │                                                   ▼                     │
//! │  transition(id) ──► local state machine ──► remote call ──► refresh()   │
//! │        │                                                   │            │
//! │        └── per-order in-flight guard                       ▼            │
//! │                                           GET /kitchen/open-orders      │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                                        FeedStatus (RwLock)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The feed is always re-fetched after a transition instead of patched in
//! place; other stations mutate the same kitchen ledger.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use till_core::validation::validate_order_id;
use till_core::{
    validate_transition, CancelReason, CancelRequest, CoreError, KitchenOrderStatus,
    KitchenOrderSummary, KitchenTransition,
};

use crate::config::KitchenSettings;
use crate::error::ClientResult;
use crate::service::TransactionService;

// =============================================================================
// Feed State
// =============================================================================

/// Last known open-order feed.
#[derive(Debug, Clone, Default)]
pub struct FeedStatus {
    pub orders: Vec<KitchenOrderSummary>,
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Message of the most recent failed refresh, cleared on success.
    pub last_error: Option<String>,
}

impl FeedStatus {
    pub fn find(&self, order_id: &str) -> Option<&KitchenOrderSummary> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The service accepted the transition.
    Applied(KitchenOrderStatus),
    /// A transition for this order is already outstanding; nothing was sent.
    AlreadyPending,
}

// =============================================================================
// Kitchen Board
// =============================================================================

/// Shared kitchen board. Cheap to clone.
#[derive(Clone)]
pub struct KitchenBoard {
    service: Arc<dyn TransactionService>,
    feed: Arc<RwLock<FeedStatus>>,
    pending: Arc<Mutex<HashSet<String>>>,
}

struct PendingOrder {
    pending: Arc<Mutex<HashSet<String>>>,
    order_id: String,
}

impl Drop for PendingOrder {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.order_id);
    }
}

impl KitchenBoard {
    pub fn new(service: Arc<dyn TransactionService>) -> Self {
        KitchenBoard {
            service,
            feed: Arc::new(RwLock::new(FeedStatus::default())),
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Snapshot of the last known feed.
    pub async fn feed(&self) -> FeedStatus {
        self.feed.read().await.clone()
    }

    pub async fn orders(&self) -> Vec<KitchenOrderSummary> {
        self.feed.read().await.orders.clone()
    }

    /// Re-fetches the open-order feed. Returns the number of orders.
    pub async fn refresh(&self) -> ClientResult<usize> {
        match self.service.open_kitchen_orders().await {
            Ok(orders) => {
                let orders: Vec<_> = orders
                    .into_iter()
                    .filter(|o| o.status != KitchenOrderStatus::Draft)
                    .collect();
                let count = orders.len();

                let mut feed = self.feed.write().await;
                feed.orders = orders;
                feed.last_refreshed = Some(Utc::now());
                feed.last_error = None;

                debug!(count, "Open-order feed refreshed");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "Open-order feed refresh failed");
                self.feed.write().await.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Requests a status transition for an order in the last known feed.
    pub async fn transition(
        &self,
        order_id: &str,
        transition: KitchenTransition,
    ) -> ClientResult<TransitionOutcome> {
        let order_id = validate_order_id(order_id)?;

        let current = self
            .feed
            .read()
            .await
            .find(order_id)
            .map(|o| o.status)
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        let target = validate_transition(order_id, current, &transition)?;

        let Some(_guard) = self.claim(order_id) else {
            debug!(%order_id, "Transition already pending");
            return Ok(TransitionOutcome::AlreadyPending);
        };

        info!(%order_id, from = %current, to = %target, "Requesting kitchen transition");
        let result = match &transition {
            KitchenTransition::MarkReady => self.service.mark_ready(order_id).await,
            KitchenTransition::MarkServed => self.service.mark_served(order_id).await,
            KitchenTransition::Cancel(request) => {
                self.service.cancel_order(order_id, request).await
            }
        };

        match result {
            Ok(()) => {
                self.refresh_after_transition().await;
                Ok(TransitionOutcome::Applied(target))
            }
            Err(err) if err.is_business_rejection() => {
                warn!(%order_id, error = %err, "Kitchen transition rejected");
                self.refresh_after_transition().await;
                Err(err)
            }
            Err(err) => {
                warn!(%order_id, error = %err, "Kitchen transition failed");
                Err(err)
            }
        }
    }

    pub async fn mark_ready(&self, order_id: &str) -> ClientResult<TransitionOutcome> {
        self.transition(order_id, KitchenTransition::MarkReady).await
    }

    pub async fn mark_served(&self, order_id: &str) -> ClientResult<TransitionOutcome> {
        self.transition(order_id, KitchenTransition::MarkServed).await
    }

    /// Cancels an order. Free text is required for [`CancelReason::Other`].
    pub async fn cancel(
        &self,
        order_id: &str,
        reason: Option<CancelReason>,
        reason_text: Option<&str>,
    ) -> ClientResult<TransitionOutcome> {
        let request = CancelRequest::new(reason, reason_text)?;
        self.transition(order_id, KitchenTransition::Cancel(request))
            .await
    }

    pub fn is_pending(&self, order_id: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(order_id)
    }

    fn claim(&self, order_id: &str) -> Option<PendingOrder> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(order_id.to_string()) {
            return None;
        }
        Some(PendingOrder {
            pending: Arc::clone(&self.pending),
            order_id: order_id.to_string(),
        })
    }

    async fn refresh_after_transition(&self) {
        // Failure is already recorded in the feed status
        let _ = self.refresh().await;
    }
}

// =============================================================================
// Feed Poller
// =============================================================================

/// Background task refreshing the open-order feed on a fixed interval.
pub struct KitchenFeedPoller {
    board: KitchenBoard,
    period: Duration,
}

/// Handle to a running poller.
pub struct KitchenFeedPollerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl KitchenFeedPollerHandle {
    /// Stops the poller and waits for it to exit.
    ///
    /// A refresh in progress is abandoned; nothing touches the feed after
    /// this returns.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "Kitchen feed poller ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl KitchenFeedPoller {
    /// Spawns the poller. The first refresh runs immediately.
    pub fn spawn(board: KitchenBoard, period: Duration) -> KitchenFeedPollerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let poller = KitchenFeedPoller { board, period };

        let task = tokio::spawn(async move {
            poller.run(shutdown_rx).await;
        });

        KitchenFeedPollerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(interval_ms = self.period.as_millis() as u64, "Kitchen feed poller started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => {
                            debug!("Abandoning in-flight feed refresh");
                            break;
                        }
                        _ = self.board.refresh() => {}
                    }
                }
            }
        }

        info!("Kitchen feed poller stopped");
    }
}

// =============================================================================
// Kitchen View
// =============================================================================

/// Runs the poller exactly while the view is mounted and kitchen order
/// management is enabled.
pub struct KitchenView {
    board: KitchenBoard,
    period: Duration,
    mounted: bool,
    feature_enabled: bool,
    poller: Option<KitchenFeedPollerHandle>,
}

impl KitchenView {
    pub fn new(board: KitchenBoard, settings: &KitchenSettings) -> Self {
        KitchenView {
            board,
            period: settings.poll_interval(),
            mounted: false,
            feature_enabled: settings.enabled,
            poller: None,
        }
    }

    pub fn board(&self) -> &KitchenBoard {
        &self.board
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    pub async fn mount(&mut self) {
        self.mounted = true;
        self.reconcile().await;
    }

    pub async fn unmount(&mut self) {
        self.mounted = false;
        self.reconcile().await;
    }

    /// Applies a change of the kitchen-order feature flag for the active
    /// service context.
    pub async fn set_feature_enabled(&mut self, enabled: bool) {
        self.feature_enabled = enabled;
        self.reconcile().await;
    }

    async fn reconcile(&mut self) {
        let wanted = self.mounted && self.feature_enabled;

        match (wanted, self.poller.take()) {
            (true, Some(handle)) => self.poller = Some(handle),
            (true, None) => {
                self.poller = Some(KitchenFeedPoller::spawn(self.board.clone(), self.period));
            }
            (false, Some(handle)) => handle.stop().await,
            (false, None) => {}
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
