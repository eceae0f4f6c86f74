//! Data source infrastructure - Concrete and decorating data sources

mod in_memory;
mod retrying;

pub use in_memory::{InMemoryDataSource, LIMIT_PARAM};
pub use retrying::RetryingDataSource;
