//! Order routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{validate_lines, AppState, EmailQuery, JsonBody, PathParam, QueryParams};
use crate::domain::aggregates::{CartLine, Order};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::UserEmail;
use crate::error::AppError;
use crate::store::UpdateAck;

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    pub user: String,
    #[validate(length(min = 1, message = "an order needs at least one product"))]
    pub products: Vec<CartLine>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PayOrderRequest {
    #[validate(length(min = 1, max = 255, message = "transactionId is required"))]
    pub transaction_id: String,
}

pub async fn place_order(State(s): State<AppState>, JsonBody(r): JsonBody<PlaceOrderRequest>) -> Result<(StatusCode, Json<Order>), AppError> {
    let user = UserEmail::parse(r.user.as_str())?;
    r.validate()?;
    validate_lines(&r.products)?;
    let order = Order::place(user, r.products)?;
    s.orders.insert_order(&order).await?;
    tracing::info!(order = %order.id, user = %order.user, total = %order.total, "order placed");
    s.events.publish(OrderEvent::Created { order_id: order.id, user: order.user.clone(), total: order.total }).await;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(State(s): State<AppState>, PathParam(id): PathParam<Uuid>) -> Result<Json<Option<Order>>, AppError> {
    Ok(Json(s.orders.find_order(id).await?))
}

pub async fn user_orders(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(s.orders.orders_for(&q.user()?).await?))
}

/// Records the payment provider's transaction id. Already-paid orders are left as they are.
pub async fn pay_order(State(s): State<AppState>, PathParam(id): PathParam<Uuid>, JsonBody(r): JsonBody<PayOrderRequest>) -> Result<Json<UpdateAck>, AppError> {
    r.validate()?;
    let ack = s.orders.mark_order_paid(id, &r.transaction_id).await?;
    if ack.modified_count > 0 {
        tracing::info!(order = %id, "order paid");
        s.events.publish(OrderEvent::Paid { order_id: id, transaction_id: r.transaction_id }).await;
    }
    Ok(Json(ack))
}
