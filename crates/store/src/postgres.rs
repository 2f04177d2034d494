use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, Money, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderWithItems,
    Product, ProductUpdate, User, UserUpdate,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{CartStore, OrderStore, ProductStore, UserStore};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_user(row: &PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            stock: row.try_get::<i32, _>("stock")? as u32,
            image: row.try_get("image")?,
        })
    }

    fn row_to_cart(row: &PgRow) -> Result<Cart> {
        Ok(Cart {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        })
    }

    fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
        Ok(CartItem {
            cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    fn map_unique_violation(e: sqlx::Error, constraint: &str, message: String) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some(constraint)
        {
            return StoreError::Conflict(message);
        }
        StoreError::Database(e)
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, email FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_user).collect()
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (id, name, email) VALUES ($1, $2, $3) RETURNING id, name, email",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Self::map_unique_violation(
                e,
                "users_email_key",
                format!("email {} is already registered", new.email),
            )
        })?;
        Self::row_to_user(&row)
    }

    async fn update_user(&self, user_id: UserId, update: UserUpdate) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1
            RETURNING id, name, email
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Self::map_unique_violation(
                e,
                "users_email_key",
                "email is already registered".to_string(),
            )
        })?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn delete_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("DELETE FROM users WHERE id = $1 RETURNING id, name, email")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }
}

const PRODUCT_COLUMNS: &str = "id, name, price_cents, description, category, stock, image";

#[async_trait]
impl ProductStore for PostgresStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_product).collect()
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, name, price_cents, description, category, stock, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(new.price.cents())
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.stock as i32)
        .bind(&new.image)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_product(&row)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET name = $2, price_cents = $3, description = $4, category = $5, stock = $6, image = $7
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(&update.name)
        .bind(update.price.cents())
        .bind(&update.description)
        .bind(&update.category)
        .bind(update.stock as i32)
        .bind(&update.image)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn update_stock(&self, product_id: ProductId, stock: u32) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "UPDATE products SET stock = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id.as_uuid())
        .bind(stock as i32)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn list_carts(&self) -> Result<Vec<Cart>> {
        let rows = sqlx::query("SELECT id, user_id FROM carts")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_cart).collect()
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, user_id FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_cart).transpose()
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        // The unique constraint on user_id makes the insert a no-op when
        // a cart already exists, so first access creates exactly one.
        sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id, user_id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_cart(&row)
    }

    async fn get_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            r#"
            SELECT cart_id, product_id, quantity
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY added_at ASC
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_cart_item).collect()
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING cart_id, product_id, quantity
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_cart_item(&row)
    }

    async fn update_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $3
            WHERE cart_id = $1 AND product_id = $2
            RETURNING cart_id, product_id, quantity
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_cart_item).transpose()
    }

    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE cart_id = $1 AND product_id = $2
            RETURNING cart_id, product_id, quantity
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_cart_item).transpose()
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, user_id, total_cents, created_at FROM orders ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row =
            sqlx::query("SELECT id, user_id, total_cents, created_at FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY added_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order_item).collect()
    }

    async fn create_order(
        &self,
        user_id: UserId,
        total: Money,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderWithItems> {
        // Header and lines go in one transaction; a partial order is
        // never visible to readers.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, total_cents, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .bind(total.cents())
        .fetch_one(&mut *tx)
        .await?;
        let order = Self::row_to_order(&row)?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in &items {
            let row = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price_cents)
                VALUES ($1, $2, $3, $4)
                RETURNING order_id, product_id, quantity, price_cents
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.price.cents())
            .fetch_one(&mut *tx)
            .await?;
            order_items.push(Self::row_to_order_item(&row)?);
        }

        tx.commit().await?;
        Ok(OrderWithItems {
            order,
            items: order_items,
        })
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "DELETE FROM orders WHERE id = $1 RETURNING id, user_id, total_cents, created_at",
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }
}
