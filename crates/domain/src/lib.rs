//! Domain layer for the shop backend.
//!
//! Plain entities for the catalog, carts, and orders, plus the `Money`
//! value object and the validation errors shared by the service layers.
//! Carts and cart items are mutable working-set data; orders and order
//! items are immutable once created, with line prices frozen at purchase
//! time.

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use error::DomainError;
pub use money::Money;
pub use order::{NewOrderItem, Order, OrderItem, OrderWithItems};
pub use product::{NewProduct, Product, ProductUpdate};
pub use user::{NewUser, User, UserUpdate};
