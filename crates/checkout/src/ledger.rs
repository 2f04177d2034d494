//! Stock movements against the product store.
//!
//! The ledger is the only code that writes stock levels during checkout
//! and cancellation. Reductions re-read the live row first; the snapshot
//! a checkout validated against may be stale by the time stock moves.

use common::ProductId;
use store::ProductStore;

use crate::error::{CheckoutError, Result, StockIssue};

/// Reduces and restores product stock one row at a time.
#[derive(Clone)]
pub struct StockLedger<P> {
    products: P,
}

impl<P: ProductStore> StockLedger<P> {
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Returns the live stock level, or `ProductNotFound`.
    pub async fn available(&self, product_id: ProductId) -> Result<u32> {
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;
        Ok(product.stock)
    }

    /// Reduces stock by `quantity`, failing with `InsufficientStock` if
    /// the live level has dropped below the requested amount.
    #[tracing::instrument(skip(self))]
    pub async fn reduce(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        if product.stock < quantity {
            metrics::counter!("stock_reduce_insufficient_total").increment(1);
            return Err(CheckoutError::InsufficientStock {
                issues: vec![StockIssue {
                    product_id,
                    product_name: product.name,
                    requested: quantity,
                    available: product.stock,
                }],
            });
        }

        self.products
            .update_stock(product_id, product.stock - quantity)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        tracing::debug!(%product_id, quantity, remaining = product.stock - quantity, "Stock reduced");
        metrics::counter!("stock_reduced_total").increment(quantity as u64);
        Ok(())
    }

    /// Adds `quantity` back to a product's stock.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        self.products
            .update_stock(product_id, product.stock + quantity)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        tracing::debug!(%product_id, quantity, level = product.stock + quantity, "Stock restored");
        metrics::counter!("stock_restored_total").increment(quantity as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, NewProduct};
    use store::{InMemoryStore, ProductStore};

    async fn seeded(stock: u32) -> (InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let product = store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                price: Money::from_cents(1000),
                description: String::new(),
                category: "test".to_string(),
                stock,
                image: String::new(),
            })
            .await
            .unwrap();
        (store, product.id)
    }

    #[tokio::test]
    async fn reduce_then_restore_round_trips() {
        let (store, id) = seeded(5).await;
        let ledger = StockLedger::new(store.clone());

        ledger.reduce(id, 3).await.unwrap();
        assert_eq!(ledger.available(id).await.unwrap(), 2);

        ledger.restore(id, 3).await.unwrap();
        assert_eq!(ledger.available(id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn reduce_checks_live_stock() {
        let (store, id) = seeded(2).await;
        let ledger = StockLedger::new(store.clone());

        let result = ledger.reduce(id, 3).await;
        match result {
            Err(CheckoutError::InsufficientStock { issues }) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].requested, 3);
                assert_eq!(issues[0].available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // Failed reduce must not touch the row
        assert_eq!(ledger.available(id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reduce_to_zero_is_allowed() {
        let (store, id) = seeded(2).await;
        let ledger = StockLedger::new(store);
        ledger.reduce(id, 2).await.unwrap();
        assert_eq!(ledger.available(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_reported() {
        let store = InMemoryStore::new();
        let ledger = StockLedger::new(store);
        let missing = ProductId::new();
        assert!(matches!(
            ledger.reduce(missing, 1).await,
            Err(CheckoutError::ProductNotFound(id)) if id == missing
        ));
    }
}
