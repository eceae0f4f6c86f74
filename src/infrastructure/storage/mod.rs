//! Storage infrastructure - Keyed storage implementations

mod bounded;
mod factory;
mod in_memory;

pub use bounded::{MokaKeyedStorage, MokaStorageConfig};
pub use factory::{KeyedStorageConfig, KeyedStorageFactory, StorageBackend};
pub use in_memory::InMemoryKeyedStorage;
