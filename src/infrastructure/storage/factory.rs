//! Storage factory for runtime backend selection

use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::storage::KeyedStorage;

use super::in_memory::InMemoryKeyedStorage;
use super::bounded::{MokaKeyedStorage, MokaStorageConfig};

/// Supported keyed storage backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Unbounded map guarded by a lock
    #[default]
    InMemory,
    /// Bounded store with optional expiry
    Moka,
}

impl FromStr for StorageBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "moka" | "bounded" => Ok(Self::Moka),
            other => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}', expected one of: in_memory, moka",
                other
            ))),
        }
    }
}

/// Keyed storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyedStorageConfig {
    pub backend: StorageBackend,
    /// Entry limit, only honoured by bounded backends
    pub max_capacity: u64,
    /// Expiry in seconds, only honoured by bounded backends
    pub time_to_live_secs: Option<u64>,
}

impl Default for KeyedStorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::InMemory,
            max_capacity: 10_000,
            time_to_live_secs: None,
        }
    }
}

impl KeyedStorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a bounded storage configuration
    pub fn moka(max_capacity: u64) -> Self {
        Self {
            backend: StorageBackend::Moka,
            max_capacity,
            time_to_live_secs: None,
        }
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live_secs = Some(ttl.as_secs());
        self
    }

    fn moka_config(&self) -> MokaStorageConfig {
        let config = MokaStorageConfig::default().with_max_capacity(self.max_capacity);
        match self.time_to_live_secs {
            Some(secs) => config.with_time_to_live(Duration::from_secs(secs)),
            None => config,
        }
    }
}

/// Factory for creating keyed storage instances
#[derive(Debug)]
pub struct KeyedStorageFactory;

impl KeyedStorageFactory {
    /// Creates a storage instance based on the configuration
    pub fn create<K, V>(config: &KeyedStorageConfig) -> Arc<dyn KeyedStorage<K, V>>
    where
        K: Clone + Debug + Eq + Hash + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match config.backend {
            StorageBackend::InMemory => Arc::new(InMemoryKeyedStorage::<K, V>::new()),
            StorageBackend::Moka => Arc::new(MokaKeyedStorage::<K, V>::with_config(
                config.moka_config(),
            )),
        }
    }

    /// Creates an in-memory storage
    pub fn create_in_memory<K, V>() -> Arc<InMemoryKeyedStorage<K, V>>
    where
        K: Eq + Hash,
    {
        Arc::new(InMemoryKeyedStorage::new())
    }
}
