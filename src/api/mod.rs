//! HTTP surface. Routes keep the storefront's historical paths.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::application::CartAggregator;
use crate::domain::aggregates::CartLine;
use crate::domain::value_objects::UserEmail;
use crate::error::AppError;
use crate::publisher::EventPublisher;
use crate::store::{DocumentStore, OrderStore, ProductStore, UserStore};

pub mod cart;
pub mod orders;
pub mod products;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub carts: CartAggregator,
    pub products: Arc<dyn ProductStore>,
    pub users: Arc<dyn UserStore>,
    pub orders: Arc<dyn OrderStore>,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new<S: DocumentStore + 'static>(store: Arc<S>, events: EventPublisher) -> Self {
        Self {
            carts: CartAggregator::new(store.clone(), events.clone()),
            products: store.clone(),
            users: store.clone(),
            orders: store,
            events,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "shopy" }))
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shopy-backend"})) }))
        // products and wishlists
        .route("/products", get(products::list_products))
        .route("/add-product", post(products::add_product))
        .route("/product/:id", get(products::get_product))
        .route("/product-approved", put(products::approve_product))
        .route("/product-edit/:id", put(products::edit_product))
        .route("/product-delete", delete(products::delete_product))
        .route("/add-to-wishlist", put(products::add_to_wishlist))
        .route("/user-wishlist", get(products::user_wishlist))
        // cart
        .route("/user-cart", get(cart::get_cart))
        .route("/add-product-to-cart", patch(cart::add_product_to_cart))
        .route("/update-cart-product", put(cart::update_cart_product))
        .route("/delete-cart-product", put(cart::delete_cart_product))
        .route("/cart-delete", delete(cart::delete_cart))
        // users
        .route("/user", get(users::get_user).put(users::upsert_user))
        .route("/users", get(users::list_users))
        // orders
        .route("/order", post(orders::place_order))
        .route("/order/:id", get(orders::get_order))
        .route("/order/:id/pay", patch(orders::pay_order))
        .route("/orders", get(orders::user_orders))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
}

/// JSON body extractor whose rejections render as `{"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

#[derive(Debug, Deserialize)] pub struct EmailQuery { pub email: String }
#[derive(Debug, Deserialize)] pub struct IdQuery { pub id: String }
#[derive(Debug, Deserialize)] pub struct WishlistQuery { pub id: String, pub email: String }

impl EmailQuery {
    pub fn user(&self) -> Result<UserEmail, AppError> { Ok(UserEmail::parse(self.email.as_str())?) }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("invalid id {raw:?}")))
}

/// Runs field validation on each line of a request body.
pub(crate) fn validate_lines(lines: &[CartLine]) -> Result<(), AppError> {
    lines.iter().try_for_each(|line| line.validate().map_err(AppError::from))
}
