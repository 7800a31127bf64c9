//! Cart routes. Every route is keyed by the `email` query parameter.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{validate_lines, AppState, EmailQuery, JsonBody, QueryParams};
use crate::application::AddOutcome;
use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::value_objects::UserEmail;
use crate::error::AppError;
use crate::store::{DeleteAck, UpdateAck};

/// Only the first product line is added; the storefront sends one at a time.
#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub user: Option<String>,
    #[validate(length(min = 1, message = "product must contain a cart line"))]
    pub product: Vec<CartLine>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartProductRequest {
    #[validate]
    pub product: LineQuantity,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "non_negative")]
    pub total: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineQuantity {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[validate(range(min = 1, message = "cartQuantity must be at least 1"))]
    pub cart_quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "non_negative")]
    pub product_total: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteCartProductRequest {
    pub id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "non_negative")]
    pub total: Decimal,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() { Err(ValidationError::new("amount cannot be negative")) } else { Ok(()) }
}

pub async fn get_cart(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>) -> Result<Json<Option<Cart>>, AppError> {
    Ok(Json(s.carts.get_cart(&q.user()?).await?))
}

/// 201 with the new cart, 200 with the grown cart, 204 when the product was already there.
pub async fn add_product_to_cart(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>, JsonBody(r): JsonBody<AddToCartRequest>) -> Result<Response, AppError> {
    let user = q.user()?;
    r.validate()?;
    if let Some(body_user) = r.user.as_deref() {
        if UserEmail::parse(body_user)? != user {
            return Err(AppError::BadRequest("body user does not match the email query parameter".into()));
        }
    }
    let Some(line) = r.product.into_iter().next() else {
        return Err(AppError::BadRequest("product must contain a cart line".into()));
    };
    validate_lines(std::slice::from_ref(&line))?;
    Ok(match s.carts.add_line(&user, line).await? {
        AddOutcome::Created(cart) => (StatusCode::CREATED, Json(cart)).into_response(),
        AddOutcome::Appended(cart) => Json(cart).into_response(),
        AddOutcome::Duplicate => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn update_cart_product(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>, JsonBody(r): JsonBody<UpdateCartProductRequest>) -> Result<Json<UpdateAck>, AppError> {
    let user = q.user()?;
    r.validate()?;
    let p = r.product;
    Ok(Json(s.carts.update_line_quantity(&user, p.id, p.cart_quantity, p.product_total, r.total).await?))
}

pub async fn delete_cart_product(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>, JsonBody(r): JsonBody<DeleteCartProductRequest>) -> Result<Json<UpdateAck>, AppError> {
    let user = q.user()?;
    r.validate()?;
    Ok(Json(s.carts.remove_line(&user, r.id, r.total).await?))
}

pub async fn delete_cart(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>) -> Result<Json<DeleteAck>, AppError> {
    Ok(Json(s.carts.clear_cart(&q.user()?).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_validation() {
        let body = serde_json::json!({"product": {"_id": Uuid::from_u128(1), "cartQuantity": 0, "productTotal": 10}, "total": 10});
        let r: UpdateCartProductRequest = serde_json::from_value(body).unwrap();
        assert!(r.validate().is_err());

        let body = serde_json::json!({"product": {"_id": Uuid::from_u128(1), "cartQuantity": 2, "productTotal": "20"}, "total": -1});
        let r: UpdateCartProductRequest = serde_json::from_value(body).unwrap();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_delete_request_accepts_zero_total() {
        let r: DeleteCartProductRequest = serde_json::from_value(serde_json::json!({"id": Uuid::from_u128(2), "total": 0})).unwrap();
        assert!(r.validate().is_ok());
    }
}
