//! Retry domain - Exponential backoff for transient failures

mod config;
mod decorator;

pub use config::RetryConfig;
pub use decorator::{Retry, RetryPredicate};
