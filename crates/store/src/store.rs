use async_trait::async_trait;
use common::{CartId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, Money, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderWithItems,
    Product, ProductUpdate, User, UserUpdate,
};

use crate::Result;

/// Row store for users.
///
/// Lookups return `None` for missing rows; callers decide whether absence
/// is an error.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Inserts a user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, new: NewUser) -> Result<User>;

    /// Applies a partial update; returns the updated row or `None`.
    async fn update_user(&self, user_id: UserId, update: UserUpdate) -> Result<Option<User>>;

    /// Deletes a user, cascading to their cart. Returns the deleted row.
    async fn delete_user(&self, user_id: UserId) -> Result<Option<User>>;
}

/// Row store for catalog products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    async fn insert_product(&self, new: NewProduct) -> Result<Product>;

    /// Replaces all catalog fields; returns the updated row or `None`.
    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>>;

    /// Writes a new stock value for one product row. The write itself is
    /// atomic per row; read-check-write sequencing is the stock ledger's
    /// concern.
    async fn update_stock(&self, product_id: ProductId, stock: u32) -> Result<Option<Product>>;

    async fn delete_product(&self, product_id: ProductId) -> Result<Option<Product>>;
}

/// Row store for carts and cart items.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn list_carts(&self) -> Result<Vec<Cart>>;

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>>;

    /// Returns the user's cart, creating an empty one on first access.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart>;

    async fn get_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>>;

    /// Adds a line to a cart. If the product is already in the cart the
    /// quantities are merged rather than creating a second line.
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem>;

    /// Sets the quantity of an existing line; returns `None` if the line
    /// does not exist.
    async fn update_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartItem>>;

    /// Removes a line; returns the removed line or `None`.
    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>>;

    /// Deletes all lines of a cart. Idempotent; returns the number of
    /// lines removed.
    async fn clear_cart(&self, cart_id: CartId) -> Result<u64>;
}

/// Row store for orders and order items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn list_orders(&self) -> Result<Vec<Order>>;

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Inserts an order header and all of its lines as one atomic unit.
    /// A partially inserted order is never observable.
    async fn create_order(
        &self,
        user_id: UserId,
        total: Money,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderWithItems>;

    /// Deletes an order, cascading to its items. Returns the deleted
    /// header or `None`.
    async fn delete_order(&self, order_id: OrderId) -> Result<Option<Order>>;
}

/// Marker for a complete backend implementing every row store, cloneable
/// for sharing across services and handlers.
pub trait Store: UserStore + ProductStore + CartStore + OrderStore + Clone + 'static {}

impl<T: UserStore + ProductStore + CartStore + OrderStore + Clone + 'static> Store for T {}
