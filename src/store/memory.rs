//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartStore, DeleteAck, InsertAck, OrderStore, ProductStore, StoreError, StoreResult, UpdateAck, UserStore};
use crate::domain::aggregates::{Cart, Order, Product, ProductPatch, User, UserProfile};
use crate::domain::value_objects::UserEmail;

#[derive(Debug, Default)]
pub struct MemoryStore {
    carts: RwLock<HashMap<UserEmail, Cart>>,
    products: RwLock<Vec<Product>>,
    users: RwLock<BTreeMap<String, User>>,
    orders: RwLock<Vec<Order>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Makes every subsequent call fail as if the connection dropped.
    pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::SeqCst); }

    fn online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) { Err(StoreError::Unavailable("memory store is offline".into())) } else { Ok(()) }
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart(&self, user: &UserEmail) -> StoreResult<Option<Cart>> {
        self.online()?;
        Ok(self.carts.read().await.get(user).cloned())
    }

    async fn insert_cart(&self, cart: &Cart) -> StoreResult<InsertAck> {
        self.online()?;
        let mut carts = self.carts.write().await;
        if carts.contains_key(cart.user()) { return Err(StoreError::Conflict(format!("cart for {} already exists", cart.user()))); }
        carts.insert(cart.user().clone(), cart.clone());
        Ok(InsertAck::new(cart.user()))
    }

    async fn replace_lines(&self, cart: &Cart) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut carts = self.carts.write().await;
        let Some(stored) = carts.get_mut(cart.user()) else { return Ok(UpdateAck::rows(0)); };
        if stored.version() != cart.version() { return Err(StoreError::Conflict(format!("cart for {} changed concurrently", cart.user()))); }
        *stored = cart.clone();
        stored.bump_version();
        Ok(UpdateAck::rows(1))
    }

    async fn set_line(&self, user: &UserEmail, product_id: Uuid, quantity: u32, line_total: Decimal, cart_total: Decimal) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut carts = self.carts.write().await;
        let Some(cart) = carts.get_mut(user) else { return Ok(UpdateAck::rows(0)); };
        match cart.set_line(product_id, quantity, line_total, cart_total) {
            Ok(()) => { cart.bump_version(); Ok(UpdateAck::rows(1)) }
            Err(_) => Ok(UpdateAck::rows(0)),
        }
    }

    async fn pull_line(&self, user: &UserEmail, product_id: Uuid, cart_total: Decimal) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut carts = self.carts.write().await;
        let Some(cart) = carts.get_mut(user) else { return Ok(UpdateAck::rows(0)); };
        match cart.remove_line(product_id, cart_total) {
            Ok(()) => { cart.bump_version(); Ok(UpdateAck::rows(1)) }
            Err(_) => Ok(UpdateAck::rows(0)),
        }
    }

    async fn delete_cart(&self, user: &UserEmail) -> StoreResult<DeleteAck> {
        self.online()?;
        let removed = self.carts.write().await.remove(user);
        Ok(DeleteAck::rows(u64::from(removed.is_some())))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.online()?;
        Ok(self.products.read().await.clone())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<InsertAck> {
        self.online()?;
        self.products.write().await.push(product.clone());
        Ok(InsertAck::new(product.id))
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        self.online()?;
        Ok(self.products.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn approve_product(&self, id: Uuid) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else { return Ok(UpdateAck::rows(0)); };
        product.approve();
        Ok(UpdateAck::rows(1))
    }

    async fn edit_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else { return Ok(UpdateAck::rows(0)); };
        product.apply(patch);
        Ok(UpdateAck::rows(1))
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<DeleteAck> {
        self.online()?;
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(DeleteAck::rows((before - products.len()) as u64))
    }

    async fn add_to_wishlist(&self, id: Uuid, user: &UserEmail) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else { return Ok(UpdateAck::rows(0)); };
        let added = product.add_to_wishlist(user.clone());
        Ok(UpdateAck::matched(1, u64::from(added)))
    }

    async fn wishlist(&self, user: &UserEmail) -> StoreResult<Vec<Product>> {
        self.online()?;
        Ok(self.products.read().await.iter().filter(|p| p.is_wishlisted_by(user)).cloned().collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, email: &UserEmail, profile: UserProfile) -> StoreResult<User> {
        self.online()?;
        let mut users = self.users.write().await;
        let user = users.entry(email.to_string())
            .and_modify(|u| u.update(profile.clone()))
            .or_insert_with(|| User::register(email.clone(), profile));
        Ok(user.clone())
    }

    async fn find_user(&self, email: &UserEmail) -> StoreResult<Option<User>> {
        self.online()?;
        Ok(self.users.read().await.get(email.as_str()).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.online()?;
        Ok(self.users.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<InsertAck> {
        self.online()?;
        self.orders.write().await.push(order.clone());
        Ok(InsertAck::new(order.id))
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.online()?;
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for(&self, user: &UserEmail) -> StoreResult<Vec<Order>> {
        self.online()?;
        let mut orders: Vec<Order> = self.orders.read().await.iter().filter(|o| &o.user == user).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn mark_order_paid(&self, id: Uuid, transaction_id: &str) -> StoreResult<UpdateAck> {
        self.online()?;
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else { return Ok(UpdateAck::rows(0)); };
        match order.mark_paid(transaction_id) {
            Ok(()) => Ok(UpdateAck::rows(1)),
            Err(_) => Ok(UpdateAck::matched(1, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CartLine;

    fn email(s: &str) -> UserEmail { UserEmail::parse(s).unwrap() }
    fn line(n: u128, price: i64) -> CartLine { CartLine::new(Uuid::from_u128(n), "item", Decimal::new(price, 0)) }

    #[tokio::test]
    async fn test_insert_cart_twice_conflicts() {
        let store = MemoryStore::new();
        let cart = Cart::open(email("a@x.com"), line(1, 10)).unwrap();
        store.insert_cart(&cart).await.unwrap();
        assert!(matches!(store.insert_cart(&cart).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_stale_replace_conflicts() {
        let store = MemoryStore::new();
        let user = email("a@x.com");
        store.insert_cart(&Cart::open(user.clone(), line(1, 10)).unwrap()).await.unwrap();

        let mut first = store.find_cart(&user).await.unwrap().unwrap();
        let mut second = first.clone();
        first.append(line(2, 5)).unwrap();
        second.append(line(3, 7)).unwrap();

        assert_eq!(store.replace_lines(&first).await.unwrap(), UpdateAck::rows(1));
        assert!(matches!(store.replace_lines(&second).await, Err(StoreError::Conflict(_))));
        let stored = store.find_cart(&user).await.unwrap().unwrap();
        assert_eq!(stored.total(), Decimal::new(15, 0));
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_offline() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.find_cart(&email("a@x.com")).await, Err(StoreError::Unavailable(_))));
        store.set_offline(false);
        assert!(store.find_cart(&email("a@x.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_orders_newest_first_and_paid_once() {
        let store = MemoryStore::new();
        let user = email("a@x.com");
        let first = Order::place(user.clone(), vec![line(1, 10)]).unwrap();
        let mut second = Order::place(user.clone(), vec![line(2, 5)]).unwrap();
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        store.insert_order(&first).await.unwrap();
        store.insert_order(&second).await.unwrap();

        let ids: Vec<Uuid> = store.orders_for(&user).await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(store.mark_order_paid(first.id, "tx1").await.unwrap(), UpdateAck::rows(1));
        assert_eq!(store.mark_order_paid(first.id, "tx2").await.unwrap(), UpdateAck::matched(1, 0));
        assert_eq!(store.find_order(first.id).await.unwrap().unwrap().transaction_id.as_deref(), Some("tx1"));
        assert_eq!(store.mark_order_paid(Uuid::from_u128(99), "tx3").await.unwrap(), UpdateAck::rows(0));
    }
}
