use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, CartLine};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::UserEmail;
use crate::publisher::EventPublisher;
use crate::store::{CartStore, DeleteAck, StoreError, UpdateAck};

/// Result of adding a line to a cart.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The user had no cart; one was inserted holding just this line.
    Created(Cart),
    /// The line was appended and the cart replaced.
    Appended(Cart),
    /// The product was already in the cart. Nothing was written.
    Duplicate,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reads a user's cart, merges lines into it and writes it back.
///
/// Appends are a read-modify-write guarded by the cart's version: if another
/// request wrote the cart in between, the write fails with
/// [`StoreError::Conflict`] instead of overwriting it. Nothing is retried.
#[derive(Clone)]
pub struct CartAggregator {
    store: Arc<dyn CartStore>,
    events: EventPublisher,
}

impl CartAggregator {
    pub fn new(store: Arc<dyn CartStore>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user: &UserEmail) -> Result<Option<Cart>, StoreError> {
        self.store.find_cart(user).await
    }

    #[tracing::instrument(skip(self, line), fields(product = %line.id))]
    pub async fn add_line(&self, user: &UserEmail, line: CartLine) -> Result<AddOutcome, AggregatorError> {
        let product_id = line.id;
        let outcome = match self.store.find_cart(user).await? {
            None => {
                let cart = Cart::open(user.clone(), line)?;
                self.store.insert_cart(&cart).await?;
                tracing::info!(total = %cart.total(), "opened cart");
                AddOutcome::Created(cart)
            }
            Some(mut cart) => match cart.append(line) {
                Err(CartError::DuplicateProduct(_)) => {
                    tracing::debug!("product already in cart, nothing to do");
                    return Ok(AddOutcome::Duplicate);
                }
                Err(e) => return Err(e.into()),
                Ok(()) => {
                    let ack = self.store.replace_lines(&cart).await?;
                    if ack.matched_count == 0 {
                        return Err(StoreError::Conflict(format!("cart for {user} was removed concurrently")).into());
                    }
                    cart.bump_version();
                    tracing::info!(lines = cart.item_count(), total = %cart.total(), "appended cart line");
                    AddOutcome::Appended(cart)
                }
            },
        };
        if let AddOutcome::Created(cart) | AddOutcome::Appended(cart) = &outcome {
            self.events.publish(CartEvent::LineAdded { user: user.clone(), product_id, total: cart.total() }).await;
        }
        Ok(outcome)
    }

    /// Sets quantity and line total on one line. `cart_total` is stored as given.
    #[tracing::instrument(skip(self))]
    pub async fn update_line_quantity(&self, user: &UserEmail, product_id: Uuid, quantity: u32, line_total: Decimal, cart_total: Decimal) -> Result<UpdateAck, StoreError> {
        self.store.set_line(user, product_id, quantity, line_total, cart_total).await
    }

    /// Pulls one line. `cart_total` is stored as given.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, user: &UserEmail, product_id: Uuid, cart_total: Decimal) -> Result<UpdateAck, StoreError> {
        self.store.pull_line(user, product_id, cart_total).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user: &UserEmail) -> Result<DeleteAck, StoreError> {
        let ack = self.store.delete_cart(user).await?;
        if ack.deleted_count > 0 {
            self.events.publish(CartEvent::Cleared { user: user.clone() }).await;
        }
        Ok(ack)
    }
}
