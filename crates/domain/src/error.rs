//! Domain validation errors.

use thiserror::Error;

use crate::money::Money;

/// Errors raised when a value fails domain validation.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Quantity must be strictly positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Price must not be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },
}
