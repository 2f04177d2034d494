//! Point-in-time cart snapshots.
//!
//! A snapshot joins the cart lines with the live catalog once, at the
//! start of checkout. Everything downstream (validation, pricing, the
//! order itself) works from the snapshot so a single checkout run sees
//! one consistent view of prices and names.

use common::{CartId, ProductId, UserId};
use domain::Money;
use serde::{Deserialize, Serialize};
use store::{CartStore, ProductStore};

use crate::error::{CheckoutError, Result};

/// One cart line joined with its catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price captured at snapshot time.
    pub unit_price: Money,
    pub line_total: Money,
    /// Stock level observed at snapshot time. Advisory only; the stock
    /// ledger re-checks live stock before every reduction.
    pub available_stock: u32,
}

/// A consistent view of one user's cart at a single point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub lines: Vec<SnapshotLine>,
    pub total_amount: Money,
    pub total_items: u32,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Builds cart snapshots from the cart and product stores.
#[derive(Clone)]
pub struct SnapshotBuilder<C, P> {
    carts: C,
    products: P,
}

impl<C: CartStore, P: ProductStore> SnapshotBuilder<C, P> {
    pub fn new(carts: C, products: P) -> Self {
        Self { carts, products }
    }

    /// Snapshots the user's cart, creating an empty cart on first access.
    ///
    /// Fails with `ProductNotFound` if any line references a product that
    /// has been removed from the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn build(&self, user_id: UserId) -> Result<CartSnapshot> {
        let cart = self.carts.get_or_create_cart(user_id).await?;
        let items = self.carts.get_cart_items(cart.id).await?;

        let mut lines = Vec::with_capacity(items.len());
        let mut total_amount = Money::zero();
        let mut total_items = 0u32;

        for item in items {
            let product = self
                .products
                .get_product(item.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(item.product_id))?;

            let line_total = product.price.multiply(item.quantity);
            total_amount += line_total;
            total_items += item.quantity;
            lines.push(SnapshotLine {
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                unit_price: product.price,
                line_total,
                available_stock: product.stock,
            });
        }

        Ok(CartSnapshot {
            cart_id: cart.id,
            user_id,
            lines,
            total_amount,
            total_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, NewProduct};
    use store::{CartStore, InMemoryStore, ProductStore};

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

    #[tokio::test]
    async fn snapshot_of_missing_cart_is_empty() {
        let store = InMemoryStore::new();
        let builder = SnapshotBuilder::new(store.clone(), store);

        let snapshot = builder.build(UserId::new()).await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_amount, Money::zero());
        assert_eq!(snapshot.total_items, 0);
    }

    #[tokio::test]
    async fn snapshot_joins_lines_with_catalog() {
        let store = InMemoryStore::new();
        let a = store.insert_product(product("A", 1000, 5)).await.unwrap();
        let b = store.insert_product(product("B", 500, 2)).await.unwrap();

        let user_id = UserId::new();
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        store.add_cart_item(cart.id, a.id, 2).await.unwrap();
        store.add_cart_item(cart.id, b.id, 1).await.unwrap();

        let builder = SnapshotBuilder::new(store.clone(), store);
        let snapshot = builder.build(user_id).await.unwrap();

        assert_eq!(snapshot.cart_id, cart.id);
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.total_items, 3);
        assert_eq!(snapshot.total_amount, Money::from_cents(2500));

        let line_a = &snapshot.lines[0];
        assert_eq!(line_a.product_name, "A");
        assert_eq!(line_a.unit_price, Money::from_cents(1000));
        assert_eq!(line_a.line_total, Money::from_cents(2000));
        assert_eq!(line_a.available_stock, 5);
    }

    #[tokio::test]
    async fn snapshot_fails_on_deleted_product() {
        let store = InMemoryStore::new();
        let a = store.insert_product(product("A", 1000, 5)).await.unwrap();

        let user_id = UserId::new();
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        store.add_cart_item(cart.id, a.id, 1).await.unwrap();
        store.delete_product(a.id).await.unwrap();

        let builder = SnapshotBuilder::new(store.clone(), store);
        let result = builder.build(user_id).await;
        assert!(matches!(result, Err(CheckoutError::ProductNotFound(id)) if id == a.id));
    }
}
