//! Bounded keyed storage backed by moka

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache as MokaCache;

use crate::domain::DomainError;
use crate::domain::storage::KeyedStorage;

/// Configuration for moka-backed storage
#[derive(Debug, Clone)]
pub struct MokaStorageConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Entries older than this are evicted
    pub time_to_live: Option<Duration>,
    /// Entries not accessed for this duration are evicted
    pub time_to_idle: Option<Duration>,
}

impl Default for MokaStorageConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_live: None,
            time_to_idle: None,
        }
    }
}

impl MokaStorageConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

/// Thread-safe bounded storage with optional expiry
///
/// Eviction happens inside the store; a cache data source on top of it
/// sees an evicted entry as missing.
pub struct MokaKeyedStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: MokaCache<K, V>,
    config: MokaStorageConfig,
}

impl<K, V> Debug for MokaKeyedStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaKeyedStorage")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl<K, V> MokaKeyedStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_config(MokaStorageConfig::default())
    }

    pub fn with_config(config: MokaStorageConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            cache: builder.build(),
            config,
        }
    }

    pub fn config(&self) -> &MokaStorageConfig {
        &self.config
    }
}

impl<K, V> Default for MokaKeyedStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedStorage<K, V> for MokaKeyedStorage<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn write(&self, key: &K, value: V) -> Result<(), DomainError> {
        self.cache.insert(key.clone(), value);
        Ok(())
    }

    fn read_one(&self, key: &K) -> Result<Option<V>, DomainError> {
        Ok(self.cache.get(key))
    }

    fn remove(&self, key: &K) -> Result<(), DomainError> {
        self.cache.invalidate(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<K>, DomainError> {
        Ok(self.cache.iter().map(|(key, _)| K::clone(&key)).collect())
    }

    fn read_all(&self) -> Result<Vec<V>, DomainError> {
        Ok(self.cache.iter().map(|(_, value)| value).collect())
    }

    fn contains(&self, key: &K) -> Result<bool, DomainError> {
        Ok(self.cache.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_one() {
        let storage: MokaKeyedStorage<u64, String> = MokaKeyedStorage::new();

        storage.write(&1, "one".to_string()).unwrap();

        assert_eq!(storage.read_one(&1).unwrap(), Some("one".to_string()));
        assert!(storage.contains(&1).unwrap());
    }

    #[test]
    fn test_write_twice_keeps_single_entry() {
        let storage: MokaKeyedStorage<u64, String> = MokaKeyedStorage::new();

        storage.write(&1, "first".to_string()).unwrap();
        storage.write(&1, "second".to_string()).unwrap();

        assert_eq!(storage.keys().unwrap(), vec![1]);
        assert_eq!(storage.read_all().unwrap(), vec!["second".to_string()]);
    }

    #[test]
    fn test_remove_and_clear() {
        let storage: MokaKeyedStorage<u64, u64> = MokaKeyedStorage::new();
        storage.write(&1, 10).unwrap();
        storage.write(&2, 20).unwrap();

        storage.remove(&1).unwrap();
        assert_eq!(storage.read_one(&1).unwrap(), None);

        storage.clear().unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let config = MokaStorageConfig::default().with_time_to_live(Duration::from_millis(20));
        let storage: MokaKeyedStorage<u64, u64> = MokaKeyedStorage::with_config(config);

        storage.write(&1, 10).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(storage.read_one(&1).unwrap(), None);
    }
}
