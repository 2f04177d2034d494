use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, Money, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderWithItems,
    Product, ProductUpdate, User, UserUpdate,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{CartStore, OrderStore, ProductStore, UserStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    /// Lines per cart, in insertion order.
    cart_items: HashMap<CartId, Vec<CartItem>>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
    /// Test hook: fail `update_stock` after this many successful calls.
    fail_stock_updates_after: Option<usize>,
    /// Test hook: overwrite a product's stock after this many successful
    /// `update_stock` calls, as if another shopper had bought it out.
    deplete_stock_after: Option<(usize, ProductId, u32)>,
    stock_update_calls: usize,
}

/// In-memory store implementation for tests and local development.
///
/// Provides the same interface as the PostgreSQL implementation. All
/// mutations run under one write lock, which gives the per-row atomicity
/// the checkout path relies on.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `update_stock` to fail once, after `calls` successful
    /// calls have gone through. Later calls succeed again so compensating
    /// writes can proceed. Test hook for exercising mid-checkout
    /// compensation.
    pub async fn fail_stock_updates_after(&self, calls: usize) {
        let mut state = self.state.write().await;
        state.fail_stock_updates_after = Some(calls);
        state.stock_update_calls = 0;
    }

    /// Sets `product_id`'s stock to `stock` once `calls` successful
    /// `update_stock` calls have gone through, then disarms. Test hook
    /// for simulating a concurrent purchase draining stock between a
    /// cart's validation and its own stock writes.
    pub async fn set_stock_after_updates(&self, calls: usize, product_id: ProductId, stock: u32) {
        let mut state = self.state.write().await;
        state.deplete_stock_after = Some((calls, product_id, stock));
        state.stock_update_calls = 0;
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all rows.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = State::default();
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<_> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                new.email
            )));
        }
        let user = User {
            id: UserId::new(),
            name: new.name,
            email: new.email,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user_id: UserId, update: UserUpdate) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(ref email) = update.email
            && state
                .users
                .values()
                .any(|u| u.id != user_id && &u.email == email)
        {
            return Err(StoreError::Conflict(format!(
                "email {email} is already registered"
            )));
        }
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.apply(update);
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, user_id: UserId) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        let removed = state.users.remove(&user_id);
        if removed.is_some() {
            // Cascade: drop the user's cart and its items.
            let cart_ids: Vec<CartId> = state
                .carts
                .values()
                .filter(|c| c.user_id == user_id)
                .map(|c| c.id)
                .collect();
            for cart_id in cart_ids {
                state.carts.remove(&cart_id);
                state.cart_items.remove(&cart_id);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            price: new.price,
            description: new.description,
            category: new.category,
            stock: new.stock,
            image: new.image,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&product_id) {
            Some(product) => {
                product.name = update.name;
                product.price = update.price;
                product.description = update.description;
                product.category = update.category;
                product.stock = update.stock;
                product.image = update.image;
                Ok(Some(product.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_stock(&self, product_id: ProductId, stock: u32) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        if let Some(limit) = state.fail_stock_updates_after
            && state.stock_update_calls >= limit
        {
            state.fail_stock_updates_after = None;
            return Err(StoreError::Backend(
                "injected stock update failure".to_string(),
            ));
        }
        state.stock_update_calls += 1;
        if let Some((limit, target, level)) = state.deplete_stock_after
            && state.stock_update_calls >= limit
        {
            state.deplete_stock_after = None;
            if let Some(product) = state.products.get_mut(&target) {
                product.stock = level;
            }
        }
        match state.products.get_mut(&product_id) {
            Some(product) => {
                product.stock = stock;
                Ok(Some(product.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.write().await.products.remove(&product_id))
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn list_carts(&self) -> Result<Vec<Cart>> {
        Ok(self.state.read().await.carts.values().copied().collect())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&cart_id).copied())
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.carts.values().find(|c| c.user_id == user_id) {
            return Ok(*cart);
        }
        let cart = Cart {
            id: CartId::new(),
            user_id,
        };
        state.carts.insert(cart.id, cart);
        Ok(cart)
    }

    async fn get_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let state = self.state.read().await;
        Ok(state.cart_items.get(&cart_id).cloned().unwrap_or_default())
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        let mut state = self.state.write().await;
        let items = state.cart_items.entry(cart_id).or_default();
        if let Some(item) = items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity += quantity;
            return Ok(item.clone());
        }
        let item = CartItem {
            cart_id,
            product_id,
            quantity,
        };
        items.push(item.clone());
        Ok(item)
    }

    async fn update_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let mut state = self.state.write().await;
        let Some(items) = state.cart_items.get_mut(&cart_id) else {
            return Ok(None);
        };
        match items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(Some(item.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        let mut state = self.state.write().await;
        let Some(items) = state.cart_items.get_mut(&cart_id) else {
            return Ok(None);
        };
        match items.iter().position(|i| i.product_id == product_id) {
            Some(pos) => Ok(Some(items.remove(pos))),
            None => Ok(None),
        }
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state
            .cart_items
            .remove(&cart_id)
            .map(|items| items.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let state = self.state.read().await;
        Ok(state.order_items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn create_order(
        &self,
        user_id: UserId,
        total: Money,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderWithItems> {
        let mut state = self.state.write().await;
        let order = Order {
            id: OrderId::new(),
            user_id,
            total,
            created_at: Utc::now(),
        };
        let order_items: Vec<OrderItem> = items
            .into_iter()
            .map(|i| OrderItem {
                order_id: order.id,
                product_id: i.product_id,
                quantity: i.quantity,
                price: i.price,
            })
            .collect();
        state.orders.insert(order.id, order.clone());
        state.order_items.insert(order.id, order_items.clone());
        Ok(OrderWithItems {
            order,
            items: order_items,
        })
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        let removed = state.orders.remove(&order_id);
        if removed.is_some() {
            state.order_items.remove(&order_id);
        }
        Ok(removed)
    }
}
