//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::cart::CartLine;
use crate::domain::value_objects::{sum_amounts, UserEmail};

/// Snapshot of purchased lines. Once placed only its payment status changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: UserEmail,
    pub products: Vec<CartLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn place(user: UserEmail, products: Vec<CartLine>) -> Result<Self, OrderError> {
        if products.is_empty() { return Err(OrderError::NoItems); }
        let line_totals: Vec<Decimal> = products.iter().map(CartLine::line_total).collect::<Option<_>>().ok_or(OrderError::AmountOverflow)?;
        let total = sum_amounts(&line_totals).ok_or(OrderError::AmountOverflow)?;
        let products = products.into_iter()
            .zip(&line_totals)
            .map(|(mut line, total)| { line.product_total = Some(*total); line })
            .collect();
        Ok(Self {
            id: Uuid::now_v7(), user, products, total,
            paid: false, transaction_id: None, created_at: Utc::now(),
        })
    }

    pub fn mark_paid(&mut self, transaction_id: impl Into<String>) -> Result<(), OrderError> {
        if self.paid { return Err(OrderError::AlreadyPaid); }
        self.paid = true;
        self.transaction_id = Some(transaction_id.into());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("an order needs at least one product")]
    NoItems,
    #[error("order is already paid")]
    AlreadyPaid,
    #[error("order total is too large")]
    AmountOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_workflow() {
        let mut mug = CartLine::new(Uuid::from_u128(1), "Mug", Decimal::new(10, 0));
        mug.cart_quantity = 2;
        let lamp = CartLine::new(Uuid::from_u128(2), "Lamp", Decimal::new(5, 0));
        let mut order = Order::place(UserEmail::parse("a@x.com").unwrap(), vec![mug, lamp]).unwrap();
        assert_eq!(order.total, Decimal::new(25, 0));
        assert_eq!(order.products[0].product_total, Some(Decimal::new(20, 0)));
        assert!(!order.paid);
        order.mark_paid("pi_123").unwrap();
        assert!(order.paid);
        assert_eq!(order.transaction_id.as_deref(), Some("pi_123"));
        assert_eq!(order.mark_paid("pi_456"), Err(OrderError::AlreadyPaid));
    }

    #[test]
    fn test_order_total_overflow() {
        let email = UserEmail::parse("a@x.com").unwrap();
        let huge = |n| CartLine::new(Uuid::from_u128(n), "Huge", Decimal::MAX);
        assert_eq!(Order::place(email.clone(), vec![huge(1), huge(2)]), Err(OrderError::AmountOverflow));
        let mut doubled = huge(1);
        doubled.cart_quantity = 2;
        assert_eq!(Order::place(email, vec![doubled]), Err(OrderError::AmountOverflow));
    }

    #[test]
    fn test_empty_order() {
        assert_eq!(Order::place(UserEmail::parse("a@x.com").unwrap(), vec![]), Err(OrderError::NoItems));
    }
}
