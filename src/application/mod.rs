//! Application services sitting between the HTTP layer and the store.
pub mod cart_aggregator;

pub use cart_aggregator::{AddOutcome, AggregatorError, CartAggregator};
