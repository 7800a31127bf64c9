//! User profile routes.

use axum::extract::State;
use axum::Json;
use validator::Validate;

use super::{AppState, EmailQuery, JsonBody, QueryParams};
use crate::domain::aggregates::{User, UserProfile};
use crate::error::AppError;

/// Creates the user on first sight, otherwise updates the supplied fields.
pub async fn upsert_user(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>, JsonBody(r): JsonBody<UserProfile>) -> Result<Json<User>, AppError> {
    let email = q.user()?;
    r.validate()?;
    Ok(Json(s.users.upsert_user(&email, r).await?))
}

pub async fn get_user(State(s): State<AppState>, QueryParams(q): QueryParams<EmailQuery>) -> Result<Json<Option<User>>, AppError> {
    Ok(Json(s.users.find_user(&q.user()?).await?))
}

pub async fn list_users(State(s): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(s.users.list_users().await?))
}
