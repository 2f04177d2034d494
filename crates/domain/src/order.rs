//! Order entities.
//!
//! Orders are append-only historical records: created in one step with
//! all of their items, deleted only by explicit cancellation.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// An order header. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// One line of an order.
///
/// `price` is a frozen copy of the product price at purchase time and is
/// never recomputed from the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItem {
    /// Returns the line total (price × quantity).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Payload for one order line, validated before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl NewOrderItem {
    /// Creates a validated order line.
    pub fn new(product_id: ProductId, quantity: u32, price: Money) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        if !price.is_positive() {
            return Err(DomainError::InvalidPrice { price });
        }
        Ok(Self {
            product_id,
            quantity,
            price,
        })
    }

    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// An order header together with all of its lines.
///
/// The two are created atomically; a header is never observable without
/// its items or vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Sum of line quantities.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
