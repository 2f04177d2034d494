//! Pre-flight validation of a cart snapshot.

use crate::error::{CheckoutError, Result, StockIssue};
use crate::snapshot::CartSnapshot;

/// Checks every snapshot line against the stock level it captured.
///
/// All failing lines are collected before returning so the caller sees
/// the full picture in one pass instead of fixing issues one at a time.
pub fn validate(snapshot: &CartSnapshot) -> Result<()> {
    if snapshot.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let issues: Vec<StockIssue> = snapshot
        .lines
        .iter()
        .filter(|line| line.quantity > line.available_stock)
        .map(|line| StockIssue {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            requested: line.quantity,
            available: line.available_stock,
        })
        .collect();

    if !issues.is_empty() {
        return Err(CheckoutError::InsufficientStock { issues });
    }

    Ok(())
}
