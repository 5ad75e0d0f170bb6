//! # Missing Price Recovery
//!
//! When an ad-hoc settlement is rejected with `missing_selling_price`, the
//! operator enters a price for each listed product. Completing the recovery:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Validate every entered price        any invalid ──► stop, no calls │
//! │  2. PATCH /products/{id} per product    first failure ──► stop         │
//! │  3. Patch matching cart lines           cart replaced ──► RecoveryStale│
//! │  4. Resubmit the ORIGINAL payload once  result handled like submit()   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Updated prices persist on the service even if the resubmission fails.
//! A recovery whose cart was cleared or replaced, or that was already
//! resubmitted, is stale: completing it sends nothing.

use std::collections::HashSet;
use tracing::{info, warn};

use till_core::validation::validate_recovered_price;
use till_core::{CartSource, Money, ValidationError};

use crate::checkout::{AttemptContext, Checkout, CheckoutOutcome, PreparedPayload};
use crate::error::{ClientError, ClientResult};
use crate::protocol::{MissingPriceProduct, SettlementRequest};

/// Pending price entry for a rejected ad-hoc settlement.
#[derive(Debug, Clone)]
pub struct PriceRecovery {
    request: SettlementRequest,
    products: Vec<MissingPriceProduct>,
    prices: Vec<String>,
    attempt: AttemptContext,
}

impl PriceRecovery {
    pub(crate) fn new(
        request: SettlementRequest,
        products: Vec<MissingPriceProduct>,
        attempt: AttemptContext,
    ) -> Self {
        let mut seen = HashSet::new();
        let products: Vec<_> = products
            .into_iter()
            .filter(|p| seen.insert(p.product_id.clone()))
            .collect();
        let prices = vec![String::new(); products.len()];

        PriceRecovery {
            request,
            products,
            prices,
            attempt,
        }
    }

    /// Products needing a price, in the order the service listed them.
    pub fn products(&self) -> &[MissingPriceProduct] {
        &self.products
    }

    /// The exact payload that was rejected.
    pub fn request(&self) -> &SettlementRequest {
        &self.request
    }

    /// Raw text entered for a product, if it is part of this recovery.
    pub fn price(&self, product_id: &str) -> Option<&str> {
        self.index_of(product_id).map(|i| self.prices[i].as_str())
    }

    /// Records the operator's raw input. `false` for unknown products.
    pub fn set_price(&mut self, product_id: &str, raw: impl Into<String>) -> bool {
        match self.index_of(product_id) {
            Some(i) => {
                self.prices[i] = raw.into();
                true
            }
            None => false,
        }
    }

    /// Parses every entered price, collecting all problems at once.
    pub fn validated(&self) -> Result<Vec<(String, Money)>, Vec<ValidationError>> {
        let mut prices = Vec::with_capacity(self.products.len());
        let mut errors = Vec::new();

        for (product, raw) in self.products.iter().zip(&self.prices) {
            match validate_recovered_price(&product.product_id, raw) {
                Ok(price) => prices.push((product.product_id.clone(), price)),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(prices)
        } else {
            Err(errors)
        }
    }

    fn index_of(&self, product_id: &str) -> Option<usize> {
        self.products.iter().position(|p| p.product_id == product_id)
    }
}

impl Checkout {
    /// Persists the entered prices and resubmits the original settlement.
    ///
    /// A recovery completes at most once. Once it has been resubmitted, or
    /// the cart it came from was cleared or replaced, completing it again
    /// returns [`CheckoutOutcome::RecoveryStale`] without any call.
    pub async fn complete_price_recovery(
        &self,
        recovery: PriceRecovery,
    ) -> ClientResult<CheckoutOutcome> {
        let prices = recovery
            .validated()
            .map_err(ClientError::InvalidRecoveredPrices)?;

        let Some(guard) = self.begin_submission() else {
            return Ok(CheckoutOutcome::AlreadyInFlight);
        };

        if !self.recovery_is_open(&recovery) {
            info!(token = %recovery.attempt.token, "Ignoring stale price recovery");
            return Ok(CheckoutOutcome::RecoveryStale);
        }

        for (product_id, price) in &prices {
            if let Err(err) = self.service.update_selling_price(product_id, *price).await {
                warn!(%product_id, error = %err, "Selling price update failed");
                let err = ClientError::PriceUpdateFailed {
                    product_id: product_id.clone(),
                    message: err.user_message(),
                };
                self.report_failure(&err);
                return Err(err);
            }
            info!(%product_id, price = %price, "Selling price updated");
        }

        {
            let mut state = self.lock();
            if state.generation != recovery.attempt.generation
                || state.open_recovery != Some(recovery.attempt.token)
            {
                // Prices stay persisted; the cart they belonged to is gone
                info!(token = %recovery.attempt.token, "Cart changed during price recovery");
                return Ok(CheckoutOutcome::RecoveryStale);
            }
            state.open_recovery = None;
            if let CartSource::AdHoc(cart) = &mut state.source {
                for (product_id, price) in &prices {
                    cart.patch_unit_price(product_id, *price);
                }
            }
        }

        let PriceRecovery {
            request,
            mut attempt,
            ..
        } = recovery;
        attempt.token = guard.token;

        info!(
            token = %attempt.token,
            products = prices.len(),
            "Resubmitting settlement after price recovery"
        );
        let result = self.service.settle(&request).await;

        let outcome = self.conclude(attempt, PreparedPayload::AdHoc(request), result);
        drop(guard);
        outcome
    }

    fn recovery_is_open(&self, recovery: &PriceRecovery) -> bool {
        let state = self.lock();
        state.generation == recovery.attempt.generation
            && state.open_recovery == Some(recovery.attempt.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutSettings;
    use crate::testing::{missing_price, rejection, snapshot, Call, FakeService};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use till_core::ProductRef;

    async fn recovering(service: &Arc<FakeService>, ids: &[&str]) -> (Checkout, PriceRecovery) {
        let checkout = Checkout::new(service.clone(), &CheckoutSettings::default());
        for id in ids {
            checkout
                .add_product(&ProductRef::new(*id, "Item", "pcs"), Decimal::ONE)
                .unwrap();
        }
        // Unpriced products settle at zero
        service.push_settle(Err(missing_price(ids)));

        match checkout.submit().await.unwrap() {
            CheckoutOutcome::PriceRecoveryRequired(recovery) => (checkout, recovery),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovery_patches_then_resubmits_once() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1"]).await;
        assert!(recovery.set_price("P1", "12.5"));

        let outcome = checkout.complete_price_recovery(recovery).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Settled(_)));

        let calls = service.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], Call::UpdatePrice("P1".into(), Money::from_cents(1250)));
        // Resubmission is byte-identical to the first attempt
        assert_eq!(calls[0], calls[2]);
        assert!(checkout.totals().net_total.is_zero());
    }

    #[tokio::test]
    async fn test_invalid_price_makes_no_calls() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1", "P2"]).await;
        recovery.set_price("P1", "abc");
        recovery.set_price("P2", "0");

        let err = checkout.complete_price_recovery(recovery).await.unwrap_err();
        match err {
            ClientError::InvalidRecoveredPrices(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_patch_failure_aborts_without_resubmit() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1", "P2"]).await;
        recovery.set_price("P1", "3");
        recovery.set_price("P2", "4");
        service.push_price_update("P1", Err(rejection(403, "forbidden", "Not allowed")));

        let err = checkout.complete_price_recovery(recovery).await.unwrap_err();
        assert!(matches!(err, ClientError::PriceUpdateFailed { ref product_id, .. } if product_id == "P1"));
        assert_eq!(service.count(|c| matches!(c, Call::UpdatePrice(..))), 1);
        assert_eq!(service.settle_calls().len(), 1);
        assert!(!checkout.is_submitting());
    }

    #[tokio::test]
    async fn test_failed_resubmit_keeps_patched_cart() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1"]).await;
        recovery.set_price("P1", "12,50");
        service.push_settle(Err(rejection(409, "stock_insufficient", "Out of stock")));

        let err = checkout.complete_price_recovery(recovery).await.unwrap_err();
        assert!(matches!(err, ClientError::StockInsufficient { .. }));
        assert_eq!(checkout.totals().net_total, Money::from_cents(1250));
    }

    #[tokio::test]
    async fn test_second_confirm_is_a_no_op() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1"]).await;
        recovery.set_price("P1", "12.5");
        let again = recovery.clone();

        let first = checkout.complete_price_recovery(recovery).await.unwrap();
        assert!(matches!(first, CheckoutOutcome::Settled(_)));

        let second = checkout.complete_price_recovery(again).await.unwrap();
        assert!(matches!(second, CheckoutOutcome::RecoveryStale));
        assert_eq!(service.settle_calls().len(), 2);
        assert_eq!(service.count(|c| matches!(c, Call::UpdatePrice(..))), 1);
    }

    #[tokio::test]
    async fn test_recovery_stale_after_clear_cart() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1"]).await;
        recovery.set_price("P1", "4");
        checkout.clear_cart().unwrap();

        let outcome = checkout.complete_price_recovery(recovery).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::RecoveryStale));
        assert_eq!(service.calls().len(), 1);
        assert!(!checkout.is_submitting());
    }

    #[tokio::test]
    async fn test_recovery_stale_after_entering_kds_mode() {
        let service = FakeService::new();
        service.add_snapshot(snapshot("ORD-1", 3550));
        let (checkout, mut recovery) = recovering(&service, &["P1"]).await;
        recovery.set_price("P1", "4");
        checkout.enter_kds_mode("ORD-1").await.unwrap();

        let outcome = checkout.complete_price_recovery(recovery).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::RecoveryStale));
        assert_eq!(service.count(|c| matches!(c, Call::UpdatePrice(..))), 0);
        assert_eq!(service.settle_calls().len(), 1);
        assert_eq!(checkout.totals().net_total, Money::from_cents(3550));
    }

    #[tokio::test]
    async fn test_retry_allowed_after_patch_failure() {
        let service = FakeService::new();
        let (checkout, mut recovery) = recovering(&service, &["P1"]).await;
        recovery.set_price("P1", "3");
        service.push_price_update("P1", Err(rejection(503, "unavailable", "Try again")));

        let err = checkout
            .complete_price_recovery(recovery.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::PriceUpdateFailed { .. }));

        let outcome = checkout.complete_price_recovery(recovery).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Settled(_)));
        assert_eq!(service.count(|c| matches!(c, Call::UpdatePrice(..))), 2);
        assert_eq!(service.settle_calls().len(), 2);
    }

    #[test]
    fn test_products_deduplicated() {
        let products = ["P1", "P1", "P2"]
            .iter()
            .map(|id| MissingPriceProduct {
                product_id: id.to_string(),
                name: None,
            })
            .collect();
        let attempt = AttemptContext {
            token: uuid::Uuid::new_v4(),
            generation: 0,
            origin: crate::checkout::SettlementOrigin::AdHoc,
            net_total: Money::zero(),
            tendered: Money::zero(),
        };
        let request = SettlementRequest {
            items: Vec::new(),
            payments: Vec::new(),
            global_discount: None,
            note: None,
        };

        let mut recovery = PriceRecovery::new(request, products, attempt);
        assert_eq!(recovery.products().len(), 2);
        assert!(!recovery.set_price("P9", "1"));
        assert_eq!(recovery.price("P2"), Some(""));
    }
}
