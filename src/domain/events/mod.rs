//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::UserEmail;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid },
    Approved { product_id: Uuid },
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    LineAdded { user: UserEmail, product_id: Uuid, #[serde(with = "rust_decimal::serde::float")] total: Decimal },
    Cleared { user: UserEmail },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user: UserEmail, #[serde(with = "rust_decimal::serde::float")] total: Decimal },
    Paid { order_id: Uuid, transaction_id: String },
}

impl DomainEvent {
    /// Subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "product.created",
            Self::Product(ProductEvent::Approved { .. }) => "product.approved",
            Self::Product(ProductEvent::Deleted { .. }) => "product.deleted",
            Self::Cart(CartEvent::LineAdded { .. }) => "cart.line_added",
            Self::Cart(CartEvent::Cleared { .. }) => "cart.cleared",
            Self::Order(OrderEvent::Created { .. }) => "order.created",
            Self::Order(OrderEvent::Paid { .. }) => "order.paid",
        }
    }
}

impl From<ProductEvent> for DomainEvent { fn from(e: ProductEvent) -> Self { Self::Product(e) } }
impl From<CartEvent> for DomainEvent { fn from(e: CartEvent) -> Self { Self::Cart(e) } }
impl From<OrderEvent> for DomainEvent { fn from(e: OrderEvent) -> Self { Self::Order(e) } }
