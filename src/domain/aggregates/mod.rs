//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{NewProduct, Product, ProductPatch};
pub use order::{Order, OrderError};
pub use cart::{Cart, CartError, CartLine};
pub use user::{Role, User, UserProfile};
