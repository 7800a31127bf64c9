//! PostgreSQL-backed document store. Embedded documents (cart lines, order
//! snapshots, opaque product attributes) live in JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

use super::{CartStore, DeleteAck, InsertAck, OrderStore, ProductStore, StoreError, StoreResult, UpdateAck, UserStore};
use crate::domain::aggregates::product::strip_managed_keys;
use crate::domain::aggregates::{Cart, CartLine, Order, Product, ProductPatch, Role, User, UserProfile};
use crate::domain::value_objects::UserEmail;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self { StoreError::Backend(e.to_string()) }
}

#[derive(Clone, Debug)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) { self.pool.close().await; }

    async fn cart_exists(&self, user: &UserEmail) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM carts WHERE user_email = $1)")
            .bind(user.as_str()).fetch_one(&self.pool).await?;
        Ok(exists)
    }
}

fn parse_email(raw: String) -> StoreResult<UserEmail> {
    UserEmail::parse(raw).map_err(|e| StoreError::Backend(format!("stored document has {e}")))
}

#[derive(sqlx::FromRow)]
struct CartRow { user_email: String, cart_products: Json<Vec<CartLine>>, total: Decimal, version: i64 }

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;
    fn try_from(r: CartRow) -> StoreResult<Self> {
        Ok(Cart::restore(parse_email(r.user_email)?, r.cart_products.0, r.total, r.version))
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid, name: String, price: Decimal, approved: bool, wish_list: Vec<String>,
    attributes: Json<Map<String, Value>>, created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> StoreResult<Self> {
        let wish_list = r.wish_list.into_iter().map(parse_email).collect::<StoreResult<Vec<_>>>()?;
        Ok(Product { id: r.id, name: r.name, price: r.price, approved: r.approved, wish_list, created_at: r.created_at, attributes: r.attributes.0 })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow { email: String, name: Option<String>, role: String, created_at: DateTime<Utc> }

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(r: UserRow) -> StoreResult<Self> {
        let role = Role::parse(&r.role).ok_or_else(|| StoreError::Backend(format!("unknown role {:?}", r.role)))?;
        Ok(User { email: parse_email(r.email)?, name: r.name, role, created_at: r.created_at })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_email: String, products: Json<Vec<CartLine>>, total: Decimal,
    paid: bool, transaction_id: Option<String>, created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> StoreResult<Self> {
        Ok(Order {
            id: r.id, user: parse_email(r.user_email)?, products: r.products.0, total: r.total,
            paid: r.paid, transaction_id: r.transaction_id, created_at: r.created_at,
        })
    }
}

const CART_COLUMNS: &str = "user_email, cart_products, total, version";
const PRODUCT_COLUMNS: &str = "id, name, price, approved, wish_list, attributes, created_at";
const ORDER_COLUMNS: &str = "id, user_email, products, total, paid, transaction_id, created_at";

#[async_trait]
impl CartStore for PgStore {
    #[tracing::instrument(skip(self), err)]
    async fn find_cart(&self, user: &UserEmail) -> StoreResult<Option<Cart>> {
        sqlx::query_as::<_, CartRow>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_email = $1"))
            .bind(user.as_str()).fetch_optional(&self.pool).await?
            .map(Cart::try_from).transpose()
    }

    #[tracing::instrument(skip_all, fields(user = %cart.user()), err)]
    async fn insert_cart(&self, cart: &Cart) -> StoreResult<InsertAck> {
        let done = sqlx::query("INSERT INTO carts (user_email, cart_products, total, version) VALUES ($1, $2, $3, 0) ON CONFLICT (user_email) DO NOTHING")
            .bind(cart.user().as_str()).bind(Json(cart.lines())).bind(cart.total())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::Conflict(format!("cart for {} already exists", cart.user()))); }
        Ok(InsertAck::new(cart.user()))
    }

    #[tracing::instrument(skip_all, fields(user = %cart.user(), version = cart.version()), err)]
    async fn replace_lines(&self, cart: &Cart) -> StoreResult<UpdateAck> {
        let done = sqlx::query("UPDATE carts SET cart_products = $2, total = $3, version = version + 1 WHERE user_email = $1 AND version = $4")
            .bind(cart.user().as_str()).bind(Json(cart.lines())).bind(cart.total()).bind(cart.version())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 && self.cart_exists(cart.user()).await? {
            return Err(StoreError::Conflict(format!("cart for {} changed concurrently", cart.user())));
        }
        Ok(UpdateAck::rows(done.rows_affected()))
    }

    #[tracing::instrument(skip(self), err)]
    async fn set_line(&self, user: &UserEmail, product_id: Uuid, quantity: u32, line_total: Decimal, cart_total: Decimal) -> StoreResult<UpdateAck> {
        let done = sqlx::query(
            "UPDATE carts SET cart_products = (
                 SELECT jsonb_agg(CASE WHEN line->>'_id' = $2
                                       THEN line || jsonb_build_object('cartQuantity', $3::int8, 'productTotal', $4::numeric)
                                       ELSE line END ORDER BY pos)
                 FROM jsonb_array_elements(cart_products) WITH ORDINALITY AS t(line, pos)),
               total = $5, version = version + 1
             WHERE user_email = $1 AND cart_products @> jsonb_build_array(jsonb_build_object('_id', $2::text))")
            .bind(user.as_str()).bind(product_id.to_string()).bind(i64::from(quantity)).bind(line_total).bind(cart_total)
            .execute(&self.pool).await?;
        Ok(UpdateAck::rows(done.rows_affected()))
    }

    #[tracing::instrument(skip(self), err)]
    async fn pull_line(&self, user: &UserEmail, product_id: Uuid, cart_total: Decimal) -> StoreResult<UpdateAck> {
        let done = sqlx::query(
            "UPDATE carts SET cart_products = COALESCE((
                 SELECT jsonb_agg(line ORDER BY pos)
                 FROM jsonb_array_elements(cart_products) WITH ORDINALITY AS t(line, pos)
                 WHERE line->>'_id' <> $2), '[]'::jsonb),
               total = $3, version = version + 1
             WHERE user_email = $1 AND cart_products @> jsonb_build_array(jsonb_build_object('_id', $2::text))")
            .bind(user.as_str()).bind(product_id.to_string()).bind(cart_total)
            .execute(&self.pool).await?;
        Ok(UpdateAck::rows(done.rows_affected()))
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_cart(&self, user: &UserEmail) -> StoreResult<DeleteAck> {
        let done = sqlx::query("DELETE FROM carts WHERE user_email = $1").bind(user.as_str()).execute(&self.pool).await?;
        Ok(DeleteAck::rows(done.rows_affected()))
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at"))
            .fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    #[tracing::instrument(skip_all, fields(product = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<InsertAck> {
        let wish_list: Vec<String> = product.wish_list.iter().map(UserEmail::to_string).collect();
        sqlx::query("INSERT INTO products (id, name, price, approved, wish_list, attributes, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(product.id).bind(&product.name).bind(product.price).bind(product.approved)
            .bind(wish_list).bind(Json(&product.attributes)).bind(product.created_at)
            .execute(&self.pool).await?;
        Ok(InsertAck::new(product.id))
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    #[tracing::instrument(skip(self), err)]
    async fn approve_product(&self, id: Uuid) -> StoreResult<UpdateAck> {
        let done = sqlx::query("UPDATE products SET approved = TRUE WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(UpdateAck::rows(done.rows_affected()))
    }

    #[tracing::instrument(skip(self, patch), err)]
    async fn edit_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<UpdateAck> {
        let mut attributes = patch.attributes;
        strip_managed_keys(&mut attributes);
        let done = sqlx::query("UPDATE products SET name = COALESCE($2, name), price = COALESCE($3, price), attributes = attributes || $4 WHERE id = $1")
            .bind(id).bind(patch.name).bind(patch.price).bind(Json(attributes))
            .execute(&self.pool).await?;
        Ok(UpdateAck::rows(done.rows_affected()))
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_product(&self, id: Uuid) -> StoreResult<DeleteAck> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(DeleteAck::rows(done.rows_affected()))
    }

    #[tracing::instrument(skip(self), err)]
    async fn add_to_wishlist(&self, id: Uuid, user: &UserEmail) -> StoreResult<UpdateAck> {
        let done = sqlx::query("UPDATE products SET wish_list = array_append(wish_list, $2) WHERE id = $1 AND NOT ($2 = ANY(wish_list))")
            .bind(id).bind(user.as_str()).execute(&self.pool).await?;
        if done.rows_affected() > 0 { return Ok(UpdateAck::rows(done.rows_affected())); }
        let (matched,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE id = $1").bind(id).fetch_one(&self.pool).await?;
        Ok(UpdateAck::matched(matched as u64, 0))
    }

    async fn wishlist(&self, user: &UserEmail) -> StoreResult<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE $1 = ANY(wish_list) ORDER BY created_at"))
            .bind(user.as_str()).fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[tracing::instrument(skip(self, profile), err)]
    async fn upsert_user(&self, email: &UserEmail, profile: UserProfile) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email, name, role, created_at) VALUES ($1, $2, COALESCE($3, 'user'), NOW())
             ON CONFLICT (email) DO UPDATE SET name = COALESCE(EXCLUDED.name, users.name), role = COALESCE($3, users.role)
             RETURNING email, name, role, created_at")
            .bind(email.as_str()).bind(profile.name).bind(profile.role.map(|r| r.as_str()))
            .fetch_one(&self.pool).await?;
        User::try_from(row)
    }

    async fn find_user(&self, email: &UserEmail) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT email, name, role, created_at FROM users WHERE email = $1")
            .bind(email.as_str()).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>("SELECT email, name, role, created_at FROM users ORDER BY email")
            .fetch_all(&self.pool).await?
            .into_iter().map(User::try_from).collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    #[tracing::instrument(skip_all, fields(order = %order.id, user = %order.user), err)]
    async fn insert_order(&self, order: &Order) -> StoreResult<InsertAck> {
        sqlx::query("INSERT INTO orders (id, user_email, products, total, paid, transaction_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(order.id).bind(order.user.as_str()).bind(Json(&order.products)).bind(order.total)
            .bind(order.paid).bind(&order.transaction_id).bind(order.created_at)
            .execute(&self.pool).await?;
        Ok(InsertAck::new(order.id))
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn orders_for(&self, user: &UserEmail) -> StoreResult<Vec<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_email = $1 ORDER BY created_at DESC"))
            .bind(user.as_str()).fetch_all(&self.pool).await?
            .into_iter().map(Order::try_from).collect()
    }

    #[tracing::instrument(skip(self), err)]
    async fn mark_order_paid(&self, id: Uuid, transaction_id: &str) -> StoreResult<UpdateAck> {
        let done = sqlx::query("UPDATE orders SET paid = TRUE, transaction_id = $2 WHERE id = $1 AND NOT paid")
            .bind(id).bind(transaction_id).execute(&self.pool).await?;
        if done.rows_affected() > 0 { return Ok(UpdateAck::rows(done.rows_affected())); }
        let (matched,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE id = $1").bind(id).fetch_one(&self.pool).await?;
        Ok(UpdateAck::matched(matched as u64, 0))
    }
}
