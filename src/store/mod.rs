//! Document store collaborators.
//!
//! Each collection gets a trait mirroring the handful of operations the
//! service needs (find, find-one, insert-one, update-one, delete-one). The
//! update operations cover field-set, array-push and array-pull on embedded
//! cart lines. [`postgres::PgStore`] keeps documents in JSONB columns;
//! [`memory::MemoryStore`] keeps them in process for tests and local runs.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, Product, ProductPatch, User, UserProfile};
use crate::domain::value_objects::UserEmail;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// An optimistic write found the document changed (or created) underneath it.
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl InsertAck {
    pub fn new(inserted_id: impl ToString) -> Self { Self { acknowledged: true, inserted_id: inserted_id.to_string() } }
}

impl UpdateAck {
    pub fn matched(matched_count: u64, modified_count: u64) -> Self { Self { acknowledged: true, matched_count, modified_count } }
    pub fn rows(n: u64) -> Self { Self::matched(n, n) }
}

impl DeleteAck {
    pub fn rows(deleted_count: u64) -> Self { Self { acknowledged: true, deleted_count } }
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, user: &UserEmail) -> StoreResult<Option<Cart>>;
    /// Fails with [`StoreError::Conflict`] when the user already has a cart.
    async fn insert_cart(&self, cart: &Cart) -> StoreResult<InsertAck>;
    /// Replaces lines and total, provided the stored version still equals `cart.version()`.
    async fn replace_lines(&self, cart: &Cart) -> StoreResult<UpdateAck>;
    async fn set_line(&self, user: &UserEmail, product_id: Uuid, quantity: u32, line_total: Decimal, cart_total: Decimal) -> StoreResult<UpdateAck>;
    async fn pull_line(&self, user: &UserEmail, product_id: Uuid, cart_total: Decimal) -> StoreResult<UpdateAck>;
    async fn delete_cart(&self, user: &UserEmail) -> StoreResult<DeleteAck>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn insert_product(&self, product: &Product) -> StoreResult<InsertAck>;
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn approve_product(&self, id: Uuid) -> StoreResult<UpdateAck>;
    async fn edit_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<UpdateAck>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<DeleteAck>;
    /// Adds `user` to the product's wishlist unless already there.
    async fn add_to_wishlist(&self, id: Uuid, user: &UserEmail) -> StoreResult<UpdateAck>;
    async fn wishlist(&self, user: &UserEmail) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user(&self, email: &UserEmail, profile: UserProfile) -> StoreResult<User>;
    async fn find_user(&self, email: &UserEmail) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> StoreResult<InsertAck>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn orders_for(&self, user: &UserEmail) -> StoreResult<Vec<Order>>;
    /// Only unpaid orders are modified.
    async fn mark_order_paid(&self, id: Uuid, transaction_id: &str) -> StoreResult<UpdateAck>;
}

/// Every collection the service touches, behind one handle.
pub trait DocumentStore: CartStore + ProductStore + UserStore + OrderStore {}

impl<T: CartStore + ProductStore + UserStore + OrderStore> DocumentStore for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_wire_format() {
        assert_eq!(serde_json::to_value(UpdateAck::rows(1)).unwrap(), serde_json::json!({"acknowledged": true, "matchedCount": 1, "modifiedCount": 1}));
        assert_eq!(serde_json::to_value(DeleteAck::rows(0)).unwrap(), serde_json::json!({"acknowledged": true, "deletedCount": 0}));
        assert_eq!(InsertAck::new("a@x.com").inserted_id, "a@x.com");
    }
}
