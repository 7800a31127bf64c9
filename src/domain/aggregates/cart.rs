//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::value_objects::{line_amount, sum_amounts, UserEmail};

/// One user's cart. `total` always equals the sum of the line prices after
/// a line is appended; quantity and removal edits take the caller's total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user: UserEmail,
    cart_products: Vec<CartLine>,
    #[serde(with = "rust_decimal::serde::float")]
    total: Decimal,
    #[serde(skip)]
    version: i64,
}

/// A product line embedded in a cart or an order snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "positive_amount")]
    pub price: Decimal,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "cartQuantity must be at least 1"))]
    pub cart_quantity: u32,
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub product_total: Option<Decimal>,
    /// Seller, category, image and whatever else the storefront attaches.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn default_quantity() -> u32 { 1 }

pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() { Ok(()) } else { Err(ValidationError::new("price must be positive")) }
}

impl CartLine {
    pub fn new(id: Uuid, name: impl Into<String>, price: Decimal) -> Self {
        Self { id, name: name.into(), price, cart_quantity: 1, product_total: None, attributes: Map::new() }
    }

    /// The stored line total, or unit price times quantity when none was sent.
    /// `None` when that product does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.product_total.or_else(|| line_amount(self.price, self.cart_quantity))
    }

    fn with_computed_total(mut self) -> Result<Self, CartError> {
        self.product_total = Some(self.line_total().ok_or(CartError::AmountOverflow(self.id))?);
        Ok(self)
    }
}

impl Cart {
    /// A fresh cart holding exactly `line`, totalling that line's price.
    pub fn open(user: UserEmail, line: CartLine) -> Result<Self, CartError> {
        check_price(&line)?;
        let line = line.with_computed_total()?;
        Ok(Self { user, total: line.price, cart_products: vec![line], version: 0 })
    }

    pub(crate) fn restore(user: UserEmail, cart_products: Vec<CartLine>, total: Decimal, version: i64) -> Self {
        Self { user, cart_products, total, version }
    }

    pub fn user(&self) -> &UserEmail { &self.user }
    pub fn lines(&self) -> &[CartLine] { &self.cart_products }
    pub fn total(&self) -> Decimal { self.total }
    pub fn version(&self) -> i64 { self.version }
    pub fn item_count(&self) -> usize { self.cart_products.len() }
    pub fn is_empty(&self) -> bool { self.cart_products.is_empty() }

    pub fn contains(&self, product_id: Uuid) -> bool {
        self.cart_products.iter().any(|l| l.id == product_id)
    }

    /// Appends a line for a product not yet in the cart and recomputes the total.
    /// The cart is left untouched on error.
    pub fn append(&mut self, line: CartLine) -> Result<(), CartError> {
        check_price(&line)?;
        if self.contains(line.id) { return Err(CartError::DuplicateProduct(line.id)); }
        let line = line.with_computed_total()?;
        let total = sum_amounts(self.cart_products.iter().chain([&line]).map(|l| &l.price))
            .ok_or(CartError::AmountOverflow(line.id))?;
        self.cart_products.push(line);
        self.total = total;
        Ok(())
    }

    /// Sets quantity and line total on the matching line and takes `cart_total` as given.
    pub fn set_line(&mut self, product_id: Uuid, quantity: u32, line_total: Decimal, cart_total: Decimal) -> Result<(), CartError> {
        let line = self.cart_products.iter_mut().find(|l| l.id == product_id).ok_or(CartError::ItemNotFound(product_id))?;
        line.cart_quantity = quantity;
        line.product_total = Some(line_total);
        self.total = cart_total;
        Ok(())
    }

    /// Pulls the matching line and takes `cart_total` as given.
    pub fn remove_line(&mut self, product_id: Uuid, cart_total: Decimal) -> Result<(), CartError> {
        let before = self.cart_products.len();
        self.cart_products.retain(|l| l.id != product_id);
        if self.cart_products.len() == before { return Err(CartError::ItemNotFound(product_id)); }
        self.total = cart_total;
        Ok(())
    }

    pub(crate) fn bump_version(&mut self) { self.version += 1; }
}

fn check_price(line: &CartLine) -> Result<(), CartError> {
    positive_amount(&line.price).map_err(|_| CartError::InvalidPrice(line.id))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("product {0} is already in the cart")]
    DuplicateProduct(Uuid),
    #[error("product {0} is not in the cart")]
    ItemNotFound(Uuid),
    #[error("product {0} must have a positive price")]
    InvalidPrice(Uuid),
    #[error("adding product {0} overflows the cart total")]
    AmountOverflow(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> UserEmail { UserEmail::parse("a@x.com").unwrap() }
    fn line(n: u128, price: i64) -> CartLine { CartLine::new(Uuid::from_u128(n), format!("P{n}"), Decimal::new(price, 0)) }

    #[test]
    fn test_open_cart() {
        let cart = Cart::open(email(), line(1, 10)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total(), Decimal::new(10, 0));
        assert_eq!(cart.lines()[0].product_total, Some(Decimal::new(10, 0)));
    }

    #[test]
    fn test_append_recomputes_from_prices() {
        let mut cart = Cart::open(email(), line(1, 10)).unwrap();
        let mut second = line(2, 5);
        second.cart_quantity = 3;
        cart.append(second).unwrap();
        // total tracks unit prices, not quantity-weighted line totals
        assert_eq!(cart.total(), Decimal::new(15, 0));
        assert_eq!(cart.lines()[1].line_total(), Some(Decimal::new(15, 0)));
    }

    #[test]
    fn test_duplicate_rejected_and_cart_unchanged() {
        let mut cart = Cart::open(email(), line(1, 10)).unwrap();
        let before = cart.clone();
        assert_eq!(cart.append(line(1, 99)), Err(CartError::DuplicateProduct(Uuid::from_u128(1))));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_non_positive_price() {
        assert!(matches!(Cart::open(email(), line(1, 0)), Err(CartError::InvalidPrice(_))));
        let mut cart = Cart::open(email(), line(1, 10)).unwrap();
        assert!(matches!(cart.append(line(2, -3)), Err(CartError::InvalidPrice(_))));
    }

    #[test]
    fn test_overflowing_totals_rejected() {
        let huge = |n| CartLine::new(Uuid::from_u128(n), "Huge", Decimal::MAX);
        let mut cart = Cart::open(email(), huge(1)).unwrap();
        let before = cart.clone();
        assert_eq!(cart.append(huge(2)), Err(CartError::AmountOverflow(Uuid::from_u128(2))));
        assert_eq!(cart, before);

        let mut doubled = huge(3);
        doubled.cart_quantity = 2;
        assert_eq!(Cart::open(email(), doubled), Err(CartError::AmountOverflow(Uuid::from_u128(3))));
    }

    #[test]
    fn test_set_line_takes_caller_totals() {
        let mut cart = Cart::open(email(), line(1, 10)).unwrap();
        cart.set_line(Uuid::from_u128(1), 4, Decimal::new(40, 0), Decimal::new(42, 0)).unwrap();
        assert_eq!(cart.lines()[0].cart_quantity, 4);
        assert_eq!(cart.total(), Decimal::new(42, 0));
        assert!(cart.set_line(Uuid::from_u128(9), 1, Decimal::ONE, Decimal::ONE).is_err());
    }

    #[test]
    fn test_remove_line_only_touches_match() {
        let mut cart = Cart::open(email(), line(1, 10)).unwrap();
        cart.append(line(2, 5)).unwrap();
        cart.append(line(3, 7)).unwrap();
        cart.remove_line(Uuid::from_u128(2), Decimal::new(17, 0)).unwrap();
        let ids: Vec<_> = cart.lines().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(1), Uuid::from_u128(3)]);
        assert_eq!(cart.total(), Decimal::new(17, 0));
    }

    #[test]
    fn test_line_wire_format() {
        let raw = r#"{"_id":"00000000-0000-0000-0000-000000000001","name":"Mug","price":"12.5","image":"mug.png"}"#;
        let line: CartLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.price, Decimal::new(125, 1));
        assert_eq!(line.cart_quantity, 1);
        assert_eq!(line.attributes.get("image"), Some(&Value::from("mug.png")));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["price"], serde_json::json!(12.5));
        assert!(json.get("productTotal").is_none());
    }
}
