//! Shopping cart entities.

use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A user's shopping cart. One per user, enforced unique; created on
/// registration or lazily on first access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
}

/// One line in a cart. Keyed by `(cart_id, product_id)`; adding the same
/// product again merges quantities instead of creating a second line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}
