//! Cache infrastructure - Cache data source implementations

mod storage_cache;

pub use storage_cache::StorageCacheDataSource;
