//! Shopy storefront backend
//!
//! REST service over a document store for the storefront.
//!
//! ## Features
//! - Product catalogue with approval and editing
//! - Per-user shopping carts with line merging and totals
//! - Wishlists
//! - User profiles
//! - Orders with payment status
//!
//! The cart rules live in [`application::CartAggregator`]; everything else maps
//! one route to one store call.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod publisher;
pub mod store;

pub use api::{router, AppState};
pub use config::Config;
pub use error::AppError;
pub use publisher::EventPublisher;
