//! # Till CLI
//!
//! Command-line shell over the checkout engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            till-cli                                     │
//! │                                                                         │
//! │  till.toml + env ──► ClientConfig ──► HttpTransactionService            │
//! │                                            │                            │
//! │                         ┌──────────────────┴──────────────┐             │
//! │                         ▼                                 ▼             │
//! │                   KitchenView (watch)            Checkout (settle)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info, warn};

use till_client::telemetry::init_tracing;
use till_client::{
    Checkout, CheckoutEventEmitter, CheckoutOutcome, ClientConfig, HttpTransactionService,
    KitchenBoard, KitchenView, SettlementReceipt,
};
use till_core::PaymentMethod;

const USAGE: &str = "usage: till-cli watch | till-cli settle <order_id> [method]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::load_or_default(None);
    config.validate().context("invalid configuration")?;
    info!(
        base_url = %config.service.base_url,
        service_id = %config.service.service_id,
        "Configuration loaded"
    );

    let service = Arc::new(
        HttpTransactionService::new(&config.service).context("failed to build HTTP client")?,
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["watch"] => watch(service, &config).await,
        ["settle", order_id] => settle(service, &config, order_id, PaymentMethod::Card).await,
        ["settle", order_id, method] => {
            let method = method.parse::<PaymentMethod>().map_err(anyhow::Error::msg)?;
            settle(service, &config, order_id, method).await
        }
        _ => bail!(USAGE),
    }
}

/// Polls the open-order feed and logs it until Ctrl+C.
async fn watch(service: Arc<HttpTransactionService>, config: &ClientConfig) -> anyhow::Result<()> {
    if !config.kitchen.enabled {
        bail!("kitchen order management is disabled for this service");
    }

    let board = KitchenBoard::new(service);
    let mut view = KitchenView::new(board.clone(), &config.kitchen);
    view.mount().await;

    let mut ticker = tokio::time::interval(config.kitchen.poll_interval());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let feed = board.feed().await;
                if let Some(err) = &feed.last_error {
                    warn!(error = %err, "Open-order feed unavailable");
                    continue;
                }
                for order in &feed.orders {
                    info!(
                        order_id = %order.order_id,
                        table = order.table_label.as_deref().unwrap_or("-"),
                        status = %order.status,
                        total = %order.total,
                        "Open order"
                    );
                }
            }
        }
    }

    view.unmount().await;
    Ok(())
}

/// Bridges a kitchen order and settles it for its full total.
async fn settle(
    service: Arc<HttpTransactionService>,
    config: &ClientConfig,
    order_id: &str,
    method: PaymentMethod,
) -> anyhow::Result<()> {
    let checkout = Checkout::with_emitter(service, &config.checkout, Arc::new(LogEmitter));

    let snapshot = checkout.enter_kds_mode(order_id).await?;
    checkout.set_payment_method(0, method);
    info!(
        order_id = %snapshot.order_id,
        lines = snapshot.lines.len(),
        total = %snapshot.total,
        %method,
        "Settling kitchen order"
    );

    match checkout.submit().await? {
        CheckoutOutcome::Settled(receipt) => {
            println!("{} settled: {} ({})", order_id, receipt.net_total, receipt.token);
            Ok(())
        }
        CheckoutOutcome::PriceRecoveryRequired(recovery) => {
            bail!("{} product(s) need a selling price", recovery.products().len())
        }
        CheckoutOutcome::AlreadyInFlight => bail!("a settlement is already in progress"),
        CheckoutOutcome::RecoveryStale => bail!("the price recovery no longer applies"),
    }
}

/// Forwards checkout events to the log.
struct LogEmitter;

impl CheckoutEventEmitter for LogEmitter {
    fn settlement_completed(&self, receipt: &SettlementReceipt) {
        info!(token = %receipt.token, net_total = %receipt.net_total, "Settlement completed");
    }

    fn checkout_failed(&self, message: &str) {
        error!(%message, "Checkout failed");
    }

    fn refresh_reports(&self) {
        info!("Reports are stale");
    }

    fn refresh_kitchen_feed(&self) {
        info!("Open-order feed is stale");
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
