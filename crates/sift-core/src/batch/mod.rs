//! Batch planning and concurrent dispatch to a label oracle.

pub mod dispatcher;
pub mod planner;
pub mod types;

pub use dispatcher::BatchDispatcher;
pub use planner::plan;
pub use types::{BatchDelivery, DeliveryOutcome, RetryPolicy};
