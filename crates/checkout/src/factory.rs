//! Order creation and cancellation.

use common::{OrderId, UserId};
use domain::{NewOrderItem, Order, OrderWithItems};
use store::{OrderStore, ProductStore};

use crate::error::{CheckoutError, Result};
use crate::ledger::StockLedger;
use crate::snapshot::CartSnapshot;

/// The result of cancelling an order.
#[derive(Debug, Clone)]
pub struct Cancellation {
    /// The deleted order header.
    pub order: Order,
    /// How many lines had their stock restored. May be less than the
    /// line count if a product vanished before cancellation.
    pub items_restored: usize,
}

/// Creates orders from cart snapshots and cancels them with stock
/// restitution.
#[derive(Clone)]
pub struct OrderFactory<P, O> {
    orders: O,
    ledger: StockLedger<P>,
}

impl<P: ProductStore, O: OrderStore> OrderFactory<P, O> {
    pub fn new(orders: O, ledger: StockLedger<P>) -> Self {
        Self { orders, ledger }
    }

    /// Creates an order from a validated snapshot.
    ///
    /// Unit prices are frozen from the snapshot; later catalog changes
    /// never alter the order. The header and all lines are inserted as
    /// one atomic unit. No stock moves here.
    #[tracing::instrument(skip(self, snapshot), fields(user_id = %user_id))]
    pub async fn create(&self, user_id: UserId, snapshot: &CartSnapshot) -> Result<OrderWithItems> {
        let total = snapshot.total_amount;
        if !total.is_positive() {
            return Err(CheckoutError::InvalidTotal { total });
        }

        let mut items = Vec::with_capacity(snapshot.lines.len());
        for line in &snapshot.lines {
            items.push(NewOrderItem::new(
                line.product_id,
                line.quantity,
                line.unit_price,
            )?);
        }

        let order = self.orders.create_order(user_id, total, items).await?;
        tracing::info!(order_id = %order.order.id, %total, lines = order.items.len(), "Order created");
        metrics::counter!("orders_created_total").increment(1);
        Ok(order)
    }

    /// Cancels an order: restores stock for every line, then deletes the
    /// order and its items.
    ///
    /// Restoration is best effort. A line whose product has vanished is
    /// logged and skipped; the cancellation still completes so the order
    /// never lingers half-cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Cancellation> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        let items = self.orders.get_order_items(order_id).await?;

        let mut items_restored = 0;
        for item in &items {
            match self.ledger.restore(item.product_id, item.quantity).await {
                Ok(()) => items_restored += 1,
                Err(e) => {
                    tracing::warn!(
                        %order_id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %e,
                        "Failed to restore stock during cancellation"
                    );
                }
            }
        }

        self.orders
            .delete_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        tracing::info!(%order_id, lines = items.len(), items_restored, "Order cancelled");
        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(Cancellation {
            order,
            items_restored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotBuilder;
    use domain::{Money, NewProduct};
    use store::{CartStore, InMemoryStore, OrderStore, ProductStore};

    fn product(name: &str, cents: i64, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Money::from_cents(cents),
            description: String::new(),
            category: "test".to_string(),
            stock,
            image: String::new(),
        }
    }

    fn factory(store: &InMemoryStore) -> OrderFactory<InMemoryStore, InMemoryStore> {
        OrderFactory::new(store.clone(), StockLedger::new(store.clone()))
    }

    #[tokio::test]
    async fn create_freezes_snapshot_prices() {
        let store = InMemoryStore::new();
        let a = store.insert_product(product("A", 1000, 5)).await.unwrap();

        let user_id = UserId::new();
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        store.add_cart_item(cart.id, a.id, 2).await.unwrap();

        let builder = SnapshotBuilder::new(store.clone(), store.clone());
        let snapshot = builder.build(user_id).await.unwrap();

        // Price change after the snapshot must not affect the order
        let mut update = store.get_product(a.id).await.unwrap().unwrap();
        update.price = Money::from_cents(9999);
        store
            .update_product(
                a.id,
                domain::ProductUpdate {
                    name: update.name,
                    price: update.price,
                    description: update.description,
                    category: update.category,
                    stock: update.stock,
                    image: update.image,
                },
            )
            .await
            .unwrap();

        let order = factory(&store).create(user_id, &snapshot).await.unwrap();
        assert_eq!(order.order.total, Money::from_cents(2000));
        assert_eq!(order.items[0].price, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn create_rejects_non_positive_total() {
        let store = InMemoryStore::new();
        let a = store.insert_product(product("Free", 0, 5)).await.unwrap();

        let user_id = UserId::new();
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        store.add_cart_item(cart.id, a.id, 1).await.unwrap();

        let builder = SnapshotBuilder::new(store.clone(), store.clone());
        let snapshot = builder.build(user_id).await.unwrap();

        let result = factory(&store).create(user_id, &snapshot).await;
        assert!(matches!(result, Err(CheckoutError::InvalidTotal { .. })));
    }

    #[tokio::test]
    async fn cancel_restores_stock_and_deletes_the_order() {
        let store = InMemoryStore::new();
        let a = store.insert_product(product("A", 1000, 5)).await.unwrap();

        let user_id = UserId::new();
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        store.add_cart_item(cart.id, a.id, 3).await.unwrap();

        let builder = SnapshotBuilder::new(store.clone(), store.clone());
        let snapshot = builder.build(user_id).await.unwrap();
        let f = factory(&store);
        let order = f.create(user_id, &snapshot).await.unwrap();

        // Simulate the fulfilled state before cancelling
        store.update_stock(a.id, 2).await.unwrap();

        let cancellation = f.cancel(order.order.id).await.unwrap();
        assert_eq!(cancellation.items_restored, 1);
        assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 5);
        assert!(store.get_order(order.order.id).await.unwrap().is_none());
        assert!(
            store
                .get_order_items(order.order.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn cancel_skips_vanished_products_but_completes() {
        let store = InMemoryStore::new();
        let a = store.insert_product(product("A", 1000, 5)).await.unwrap();
        let b = store.insert_product(product("B", 500, 5)).await.unwrap();

        let user_id = UserId::new();
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        store.add_cart_item(cart.id, a.id, 1).await.unwrap();
        store.add_cart_item(cart.id, b.id, 1).await.unwrap();

        let builder = SnapshotBuilder::new(store.clone(), store.clone());
        let snapshot = builder.build(user_id).await.unwrap();
        let f = factory(&store);
        let order = f.create(user_id, &snapshot).await.unwrap();

        store.delete_product(a.id).await.unwrap();
        store.update_stock(b.id, 4).await.unwrap();

        let cancellation = f.cancel(order.order.id).await.unwrap();
        assert_eq!(cancellation.items_restored, 1);
        assert!(store.get_order(order.order.id).await.unwrap().is_none());
        assert_eq!(store.get_product(b.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn cancel_of_unknown_order_fails() {
        let store = InMemoryStore::new();
        let missing = OrderId::new();
        let result = factory(&store).cancel(missing).await;
        assert!(matches!(
            result,
            Err(CheckoutError::OrderNotFound(id)) if id == missing
        ));
    }
}
