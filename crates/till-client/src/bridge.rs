//! # Kitchen Order Bridge
//!
//! Moves the checkout between ad-hoc mode and KDS mode.
//!
//! ```text
//!   AdHoc(cart) ──enter_kds_mode(id)──► Bridged(snapshot)
//!        ▲                                   │
//!        └──── exit_kds_mode() / settled ────┘
//! ```
//!
//! Entering fetches the order's authoritative snapshot once. Its totals are
//! never recomputed locally and the ledger is seeded with a single card
//! payment for the full amount.

use tracing::info;

use till_core::validation::validate_order_id;
use till_core::{CartSource, KitchenOrderSnapshot, PaymentLedger, PaymentMethod};

use crate::checkout::Checkout;
use crate::error::ClientResult;

impl Checkout {
    /// Loads a kitchen order into the checkout, replacing the current source.
    ///
    /// On failure the current source is left untouched.
    pub async fn enter_kds_mode(&self, order_id: &str) -> ClientResult<KitchenOrderSnapshot> {
        let order_id = validate_order_id(order_id)?;
        let snapshot = self.service.kitchen_order_for_checkout(order_id).await?;

        {
            let mut state = self.lock();
            state.source = CartSource::Bridged(snapshot.clone());
            state.ledger = PaymentLedger::seeded(PaymentMethod::Card, snapshot.total);
            state.note = None;
            state.generation += 1;
            state.open_recovery = None;
        }

        info!(
            order_id = %snapshot.order_id,
            total = %snapshot.total,
            "Kitchen order loaded for checkout"
        );

        Ok(snapshot)
    }

    /// Returns to an empty ad-hoc cart. `false` if not in KDS mode.
    pub fn exit_kds_mode(&self) -> bool {
        let mut state = self.lock();
        let Some(order_id) = state.source.bridged_order_id().map(str::to_string) else {
            return false;
        };

        state.reset_to_ad_hoc();
        info!(%order_id, "Left KDS mode");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutSettings;
    use crate::error::ClientError;
    use crate::testing::{snapshot, Call, FakeService};
    use rust_decimal::Decimal;
    use till_core::{CoreError, DiscountType, Money, PaymentEntry, ProductRef, TransactionTotals};

    fn checkout(service: &std::sync::Arc<FakeService>) -> Checkout {
        Checkout::new(service.clone(), &CheckoutSettings::default())
    }

    #[tokio::test]
    async fn test_enter_seeds_card_payment() {
        let service = FakeService::new();
        service.add_snapshot(snapshot("ORD-1", 3550));
        let checkout = checkout(&service);

        checkout.enter_kds_mode("ORD-1").await.unwrap();

        assert!(checkout.is_kds_mode());
        let ledger = checkout.ledger();
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].method, PaymentMethod::Card);
        assert_eq!(ledger.total(), Money::from_cents(3550));
        assert_eq!(service.count(|c| matches!(c, Call::ForCheckout(_))), 1);
    }

    #[tokio::test]
    async fn test_totals_taken_verbatim() {
        let service = FakeService::new();
        service.add_snapshot(snapshot("ORD-1", 3550));
        let checkout = checkout(&service);

        checkout.enter_kds_mode("ORD-1").await.unwrap();

        let totals = checkout.totals();
        assert_eq!(totals.subtotal, Money::from_cents(4050));
        assert_eq!(totals.net_total, Money::from_cents(3550));
    }

    #[tokio::test]
    async fn test_entering_replaces_discounted_cart_with_snapshot() {
        let service = FakeService::new();
        let order = snapshot("ORD-1", 3550);
        service.add_snapshot(order.clone());
        let checkout = checkout(&service);

        let product = ProductRef::new("P1", "Espresso", "pcs");
        checkout.add_product(&product, Decimal::from(3)).unwrap();
        checkout.set_unit_price("P1", "9.99").unwrap();
        checkout.set_line_discount("P1", "10", DiscountType::Percent).unwrap();
        checkout.set_global_discount("2.5", DiscountType::Amount).unwrap();
        checkout.set_payment_amount(0, "20");
        checkout.add_payment(PaymentMethod::Cheque, "5");
        assert_ne!(checkout.totals(), TransactionTotals::from_snapshot(&order));

        checkout.enter_kds_mode("ORD-1").await.unwrap();

        let totals = checkout.totals();
        assert_eq!(totals, TransactionTotals::from_snapshot(&order));
        assert_eq!(totals.line_discount_total, Money::from_cents(500));
        assert_eq!(totals.global_discount_total, Money::zero());
        assert_eq!(
            checkout.ledger().entries(),
            &[PaymentEntry::new(PaymentMethod::Card, "35.50")]
        );
        assert_eq!(checkout.ledger().entries()[0].parsed_amount(), order.total);
    }

    #[tokio::test]
    async fn test_cart_edits_refused_in_kds_mode() {
        let service = FakeService::new();
        service.add_snapshot(snapshot("ORD-1", 3550));
        let checkout = checkout(&service);
        checkout.enter_kds_mode("ORD-1").await.unwrap();

        let product = ProductRef::new("P1", "Espresso", "pcs");
        assert!(matches!(
            checkout.add_product(&product, Decimal::ONE),
            Err(CoreError::ModeExclusive { .. })
        ));
        assert!(matches!(
            checkout.set_global_discount("2", DiscountType::Amount),
            Err(CoreError::ModeExclusive { .. })
        ));
        assert!(matches!(
            checkout.clear_cart(),
            Err(CoreError::ModeExclusive { .. })
        ));
        assert_eq!(checkout.totals().net_total, Money::from_cents(3550));
    }

    #[tokio::test]
    async fn test_reenter_replaces_order() {
        let service = FakeService::new();
        service.add_snapshot(snapshot("ORD-1", 3550));
        service.add_snapshot(snapshot("ORD-2", 1200));
        let checkout = checkout(&service);

        checkout.enter_kds_mode("ORD-1").await.unwrap();
        checkout.add_payment(PaymentMethod::Cash, "5");
        checkout.enter_kds_mode("ORD-2").await.unwrap();

        assert_eq!(checkout.bridged_order_id().as_deref(), Some("ORD-2"));
        assert_eq!(checkout.ledger().entries().len(), 1);
        assert_eq!(checkout.ledger().total(), Money::from_cents(1200));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_cart() {
        let service = FakeService::new();
        let checkout = checkout(&service);
        let product = ProductRef::new("P1", "Espresso", "pcs")
            .with_selling_price(Money::from_cents(250));
        checkout.add_product(&product, Decimal::ONE).unwrap();

        let err = checkout.enter_kds_mode("ORD-404").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
        assert!(!checkout.is_kds_mode());
        assert_eq!(checkout.totals().net_total, Money::from_cents(250));
    }

    #[tokio::test]
    async fn test_blank_order_id_rejected_locally() {
        let service = FakeService::new();
        let checkout = checkout(&service);

        let err = checkout.enter_kds_mode("   ").await.unwrap_err();
        assert!(err.is_local());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_exit_returns_to_empty_cart() {
        let service = FakeService::new();
        service.add_snapshot(snapshot("ORD-1", 3550));
        let checkout = checkout(&service);

        assert!(!checkout.exit_kds_mode());
        checkout.enter_kds_mode("ORD-1").await.unwrap();
        assert!(checkout.exit_kds_mode());

        assert!(!checkout.is_kds_mode());
        assert_eq!(checkout.totals().net_total, Money::zero());
        assert_eq!(checkout.ledger(), PaymentLedger::new());
    }
}
