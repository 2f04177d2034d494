//! Product catalog entity.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A catalog product.
///
/// `stock` is only ever mutated through the stock ledger; it never goes
/// negative. `price` is the live catalog price — order lines carry their
/// own frozen copy taken at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub description: String,
    pub category: String,
    pub stock: u32,
    pub image: String,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub stock: u32,
    #[serde(default)]
    pub image: String,
}

impl NewProduct {
    /// Validates the payload before persistence.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.price.is_negative() {
            return Err(DomainError::InvalidPrice { price: self.price });
        }
        Ok(())
    }
}

/// Full-field product update, mirroring the catalog PUT semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub stock: u32,
    #[serde(default)]
    pub image: String,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.price.is_negative() {
            return Err(DomainError::InvalidPrice { price: self.price });
        }
        Ok(())
    }
}

impl Product {
    /// Returns a copy of this product with the given stock level.
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            description: String::new(),
            category: "tools".to_string(),
            stock: 5,
            image: String::new(),
        }
    }

    #[test]
    fn valid_product_passes() {
        assert!(widget().validate().is_ok());
    }

    #[test]
    fn negative_price_rejected() {
        let mut p = widget();
        p.price = Money::from_cents(-1);
        assert!(matches!(
            p.validate(),
            Err(DomainError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn zero_price_allowed() {
        let mut p = widget();
        p.price = Money::zero();
        assert!(p.validate().is_ok());
    }
}
