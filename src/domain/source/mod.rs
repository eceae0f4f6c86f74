//! Data source domain - Readable, writable and cache source contracts

mod params;
mod traits;

pub use params::RequestParams;
pub use traits::{CacheDataSource, ReadableDataSource, WritableDataSource};

#[cfg(test)]
pub use traits::mock;
