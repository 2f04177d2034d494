use common::{OrderId, ProductId};
use domain::{DomainError, Money};
use serde::{Deserialize, Serialize};
use store::StoreError;
use thiserror::Error;

/// One cart line that cannot be fulfilled from current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssue {
    pub product_id: ProductId,
    pub product_name: String,
    pub requested: u32,
    pub available: u32,
}

impl std::fmt::Display for StockIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: requested {}, available {}",
            self.product_name, self.requested, self.available
        )
    }
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A cart line references a product that no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order to cancel does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The cart has no lines to purchase.
    #[error("Cart is empty")]
    EmptyCart,

    /// One or more cart lines exceed available stock. Every failing line
    /// is reported, not just the first.
    #[error("Insufficient stock for {} product(s)", issues.len())]
    InsufficientStock { issues: Vec<StockIssue> },

    /// The computed order total is not positive.
    #[error("Invalid order total: {total}")]
    InvalidTotal { total: Money },

    /// Stock ran out between validation and reduction; the order was
    /// rolled back.
    #[error("Stock reduction failed and the order was rolled back: {issue}")]
    StockReduceFailed { issue: StockIssue },

    /// A domain validation error occurred.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A store error occurred.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_counts_issues() {
        let err = CheckoutError::InsufficientStock {
            issues: vec![
                StockIssue {
                    product_id: ProductId::new(),
                    product_name: "A".to_string(),
                    requested: 3,
                    available: 1,
                },
                StockIssue {
                    product_id: ProductId::new(),
                    product_name: "B".to_string(),
                    requested: 2,
                    available: 0,
                },
            ],
        };
        assert_eq!(err.to_string(), "Insufficient stock for 2 product(s)");
    }

    #[test]
    fn stock_issue_display_names_the_product() {
        let issue = StockIssue {
            product_id: ProductId::new(),
            product_name: "Widget".to_string(),
            requested: 5,
            available: 2,
        };
        assert_eq!(issue.to_string(), "Widget: requested 5, available 2");
    }
}
