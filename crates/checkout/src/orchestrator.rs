//! Checkout orchestration.
//!
//! Drives a cart purchase end to end: snapshot, validate, create the
//! order, reduce stock line by line, clear the cart. A failed stock
//! reduction triggers compensation (cancel the order, which restores
//! the lines already reduced) so a failed checkout leaves no order
//! behind.

use common::UserId;
use domain::{Money, OrderWithItems};
use serde::{Deserialize, Serialize};
use store::{CartStore, OrderStore, ProductStore};

use crate::error::{CheckoutError, Result};
use crate::factory::OrderFactory;
use crate::ledger::StockLedger;
use crate::snapshot::{CartSnapshot, SnapshotBuilder};
use crate::state::CheckoutState;
use crate::validator;

/// The result of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order: OrderWithItems,
    pub items_purchased: u32,
    pub total_amount: Money,
}

/// Orchestrates the cart-to-order checkout workflow.
#[derive(Clone)]
pub struct CheckoutOrchestrator<C, P, O> {
    carts: C,
    snapshots: SnapshotBuilder<C, P>,
    ledger: StockLedger<P>,
    factory: OrderFactory<P, O>,
}

impl<C, P, O> CheckoutOrchestrator<C, P, O>
where
    C: CartStore + Clone,
    P: ProductStore + Clone,
    O: OrderStore,
{
    pub fn new(carts: C, products: P, orders: O) -> Self {
        let snapshots = SnapshotBuilder::new(carts.clone(), products.clone());
        let ledger = StockLedger::new(products.clone());
        let factory = OrderFactory::new(orders, StockLedger::new(products));
        Self {
            carts,
            snapshots,
            ledger,
            factory,
        }
    }

    /// Purchases the user's cart.
    ///
    /// On success the order exists, every line's stock is reduced, and
    /// the cart is empty. On failure no order exists and stock is back
    /// at its pre-checkout level; the cart is left untouched so the user
    /// can correct it.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_executions_total").increment(1);
        let checkout_start = std::time::Instant::now();
        let mut state = CheckoutState::Validating;
        tracing::info!(%state, "Checkout started");

        // 1. Snapshot and validate
        let snapshot = self.snapshots.build(user_id).await?;
        validator::validate(&snapshot)?;

        // 2. Create the order before any stock moves; cancellation is
        // then the single compensation path for every later failure.
        let order = self.factory.create(user_id, &snapshot).await?;
        state = CheckoutState::OrderCreated;
        tracing::info!(%state, order_id = %order.order.id, "Checkout order created");

        // 3. Reduce stock line by line
        state = CheckoutState::StockReducing;
        tracing::info!(%state, lines = snapshot.lines.len(), "Reducing stock");
        for line in &snapshot.lines {
            if let Err(e) = self.ledger.reduce(line.product_id, line.quantity).await {
                return Err(self.compensate(&snapshot, order, e, checkout_start).await);
            }
        }

        // 4. Clear the cart. The purchase itself has succeeded; a
        // failure here leaves stale lines behind but no inconsistency
        // in orders or stock.
        if let Err(e) = self.carts.clear_cart(snapshot.cart_id).await {
            tracing::warn!(cart_id = %snapshot.cart_id, error = %e, "Failed to clear cart after checkout");
        }

        state = CheckoutState::Completed;
        let duration = checkout_start.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        metrics::counter!("checkout_completed").increment(1);
        tracing::info!(%state, order_id = %order.order.id, duration, "Checkout completed");

        Ok(CheckoutReceipt {
            items_purchased: snapshot.total_items,
            total_amount: snapshot.total_amount,
            order,
        })
    }

    /// Rolls back a checkout whose stock reduction failed.
    ///
    /// Cancelling the order restores stock for every order line, which
    /// covers the lines already reduced. Cancellation errors are
    /// swallowed; the caller gets the original failure either way.
    async fn compensate(
        &self,
        snapshot: &CartSnapshot,
        order: OrderWithItems,
        cause: CheckoutError,
        checkout_start: std::time::Instant,
    ) -> CheckoutError {
        let state = CheckoutState::Aborted;
        tracing::warn!(
            %state,
            order_id = %order.order.id,
            cart_id = %snapshot.cart_id,
            error = %cause,
            "Checkout failed, compensating"
        );

        if let Err(e) = self.factory.cancel(order.order.id).await {
            tracing::error!(
                order_id = %order.order.id,
                error = %e,
                "Compensation failed; order may need manual cleanup"
            );
        }

        metrics::histogram!("checkout_duration_seconds")
            .record(checkout_start.elapsed().as_secs_f64());
        metrics::counter!("checkout_failed").increment(1);

        match cause {
            // A mid-flight stock shortfall reads differently to callers
            // than a pre-flight one: the order was created and rolled
            // back, not rejected up front.
            CheckoutError::InsufficientStock { mut issues } if !issues.is_empty() => {
                CheckoutError::StockReduceFailed {
                    issue: issues.remove(0),
                }
            }
            other => other,
        }
    }
}
