//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::cart::positive_amount;
use crate::domain::value_objects::UserEmail;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub wish_list: Vec<UserEmail>,
    pub created_at: DateTime<Utc>,
    /// Seller and category details are opaque to the service.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Body of `POST /add-product`.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "positive_amount")]
    pub price: Decimal,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Body of `PUT /product-edit/:id`. Absent fields are left alone, attributes are merged.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, message = "name cannot be blank"))]
    pub name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom = "positive_amount")]
    pub price: Option<Decimal>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    /// New products start unapproved with an empty wishlist.
    pub fn create(input: NewProduct) -> Self {
        let mut attributes = input.attributes;
        strip_managed_keys(&mut attributes);
        Self {
            id: Uuid::now_v7(), name: input.name, price: input.price, approved: false,
            wish_list: vec![], created_at: Utc::now(), attributes,
        }
    }

    pub fn approve(&mut self) { self.approved = true; }

    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name { self.name = name; }
        if let Some(price) = patch.price { self.price = price; }
        let mut attributes = patch.attributes;
        strip_managed_keys(&mut attributes);
        self.attributes.extend(attributes);
    }

    /// Records `user` as wishlisting this product. Returns false if already present.
    pub fn add_to_wishlist(&mut self, user: UserEmail) -> bool {
        if self.wish_list.contains(&user) { return false; }
        self.wish_list.push(user);
        true
    }

    pub fn is_wishlisted_by(&self, user: &UserEmail) -> bool { self.wish_list.contains(user) }
}

/// Keys the service owns; clients cannot smuggle them in through the opaque attributes.
pub(crate) fn strip_managed_keys(attributes: &mut Map<String, Value>) {
    for key in ["_id", "approved", "wishList", "createdAt"] {
        attributes.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_product(body: Value) -> NewProduct { serde_json::from_value(body).unwrap() }

    #[test]
    fn test_product_create() {
        let p = Product::create(new_product(json!({"name": "Lamp", "price": 20, "seller": "s@x.com", "approved": true})));
        assert_eq!(p.name, "Lamp");
        assert!(!p.approved);
        assert_eq!(p.attributes.get("seller"), Some(&json!("s@x.com")));
        assert!(p.attributes.get("approved").is_none());
    }

    #[test]
    fn test_new_product_validation() {
        assert!(new_product(json!({"name": "", "price": 1})).validate().is_err());
        assert!(new_product(json!({"name": "x", "price": 0})).validate().is_err());
        assert!(new_product(json!({"name": "x", "price": "3.5"})).validate().is_ok());
    }

    #[test]
    fn test_apply_patch() {
        let mut p = Product::create(new_product(json!({"name": "Lamp", "price": 20, "category": "home"})));
        p.apply(serde_json::from_value(json!({"price": 25, "category": "lighting"})).unwrap());
        assert_eq!(p.name, "Lamp");
        assert_eq!(p.price, Decimal::new(25, 0));
        assert_eq!(p.attributes.get("category"), Some(&json!("lighting")));
    }

    #[test]
    fn test_wishlist_dedupes() {
        let mut p = Product::create(new_product(json!({"name": "Lamp", "price": 20})));
        let user = UserEmail::parse("w@x.com").unwrap();
        assert!(p.add_to_wishlist(user.clone()));
        assert!(!p.add_to_wishlist(user.clone()));
        assert_eq!(p.wish_list.len(), 1);
        assert!(p.is_wishlisted_by(&user));
    }
}
