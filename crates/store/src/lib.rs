//! Persistence layer for the shop backend.
//!
//! Four narrow async traits cover the row stores the service layers
//! depend on: users, products, carts, and orders. Two backends implement
//! all of them: [`InMemoryStore`] for tests and local development, and
//! [`PostgresStore`] backed by sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CartStore, OrderStore, ProductStore, Store, UserStore};
