//! Product catalogue and wishlist routes.

use axum::extract::State;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use super::{parse_id, AppState, EmailQuery, IdQuery, JsonBody, PathParam, QueryParams, WishlistQuery};
use crate::domain::aggregates::{NewProduct, Product, ProductPatch};
use crate::domain::events::ProductEvent;
use crate::domain::value_objects::UserEmail;
use crate::error::AppError;
use crate::store::{DeleteAck, InsertAck, UpdateAck};

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(s.products.list_products().await?))
}

pub async fn add_product(State(s): State<AppState>, JsonBody(r): JsonBody<NewProduct>) -> Result<Json<InsertAck>, AppError> {
    r.validate()?;
    let product = Product::create(r);
    let ack = s.products.insert_product(&product).await?;
    tracing::info!(product = %product.id, name = %product.name, "product added");
    s.events.publish(ProductEvent::Created { product_id: product.id }).await;
    Ok(Json(ack))
}

pub async fn get_product(State(s): State<AppState>, PathParam(id): PathParam<Uuid>) -> Result<Json<Option<Product>>, AppError> {
    Ok(Json(s.products.find_product(id).await?))
}

pub async fn approve_product(State(s): State<AppState>, QueryParams(q): QueryParams<IdQuery>) -> Result<Json<UpdateAck>, AppError> {
    let id = parse_id(&q.id)?;
    let ack = s.products.approve_product(id).await?;
    if ack.matched_count > 0 {
        s.events.publish(ProductEvent::Approved { product_id: id }).await;
    }
    Ok(Json(ack))
}

pub async fn edit_product(State(s): State<AppState>, PathParam(id): PathParam<Uuid>, JsonBody(r): JsonBody<ProductPatch>) -> Result<Json<UpdateAck>, AppError> {
    r.validate()?;
    Ok(Json(s.products.edit_product(id, r).await?))
}

pub async fn delete_product(State(s): State<AppState>, QueryParams(q): QueryParams<IdQuery>) -> Result<Json<DeleteAck>, AppError> {
    let id = parse_id(&q.id)?;
    let ack = s.products.delete_product(id).await?;
    if ack.deleted_count > 0 {
        s.events.publish(ProductEvent::Deleted { product_id: id }).await;
    }
    Ok(Json(ack))
}

pub async fn add_to_wishlist(State(s): State<AppState>, QueryParams(q): QueryParams<WishlistQuery>) -> Result<Json<UpdateAck>, AppError> {
    let id = parse_id(&q.id)?;
    let user = UserEmail::parse(q.email.as_str())?;
    Ok(Json(s.products.add_to_wishlist(id, &user).await?))
}

pub async fn user_wishlist(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(s.products.wishlist(&q.user()?).await?))
}
