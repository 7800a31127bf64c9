use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::application::AggregatorError;
use crate::domain::aggregates::{CartError, OrderError};
use crate::domain::value_objects::EmailError;
use crate::store::StoreError;

/// Errors as they reach the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// An extractor refused the request; keeps axum's status and message.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EmailError> for AppError {
    fn from(e: EmailError) -> Self { AppError::BadRequest(e.to_string()) }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self { AppError::Rejected { status: r.status(), message: r.body_text() } }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self { AppError::Rejected { status: r.status(), message: r.body_text() } }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self { AppError::Rejected { status: r.status(), message: r.body_text() } }
}

impl From<AggregatorError> for AppError {
    fn from(e: AggregatorError) -> Self {
        match e {
            AggregatorError::Cart(e) => AppError::Cart(e),
            AggregatorError::Store(e) => AppError::Store(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected { status, .. } => *status,
            AppError::Validation(_) | AppError::Order(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Cart(CartError::ItemNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Cart(CartError::DuplicateProduct(_)) => StatusCode::CONFLICT,
            AppError::Cart(CartError::InvalidPrice(_) | CartError::AmountOverflow(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(StoreError::Backend(detail)) => {
                tracing::error!(%detail, "store error");
                "Internal server error".to_string()
            }
            AppError::Store(e @ StoreError::Unavailable(_)) => {
                tracing::error!(error = %e, "store unavailable");
                "Store unavailable".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_bad_request_returns_400() {
        let resp = AppError::from(EmailError::Empty).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_errors_map_by_kind() {
        assert_eq!(AppError::Store(StoreError::Conflict("x".into())).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Store(StoreError::Unavailable("x".into())).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::Store(StoreError::Backend("x".into())).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_aggregator_errors_unwrap() {
        let err: AppError = AggregatorError::Cart(CartError::InvalidPrice(Uuid::nil())).into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let err: AppError = AggregatorError::Store(StoreError::Unavailable("down".into())).into();
        assert!(matches!(err, AppError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_amount_overflow_is_422() {
        assert_eq!(AppError::Cart(CartError::AmountOverflow(Uuid::nil())).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Order(OrderError::AmountOverflow).status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_rejection_keeps_status() {
        let err = AppError::Rejected { status: StatusCode::UNSUPPORTED_MEDIA_TYPE, message: "Expected request with `Content-Type: application/json`".into() };
        assert_eq!(err.into_response().status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_display() {
        assert_eq!(AppError::BadRequest("missing id".into()).to_string(), "missing id");
        assert_eq!(AppError::Order(OrderError::NoItems).to_string(), "an order needs at least one product");
    }
}
