//! In-memory keyed storage implementation

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::RwLock;

use crate::domain::DomainError;
use crate::domain::storage::KeyedStorage;

/// Thread-safe in-memory keyed storage
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryKeyedStorage<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for InMemoryKeyedStorage<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> InMemoryKeyedStorage<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-populated with entries
    pub fn with_entries(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(e: impl std::fmt::Display) -> DomainError {
    DomainError::storage(format!("Storage lock poisoned: {}", e))
}

impl<K, V> KeyedStorage<K, V> for InMemoryKeyedStorage<K, V>
where
    K: Clone + Debug + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn write(&self, key: &K, value: V) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.clone(), value);
        Ok(())
    }

    fn read_one(&self, key: &K) -> Result<Option<V>, DomainError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn remove(&self, key: &K) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<K>, DomainError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.keys().cloned().collect())
    }

    fn read_all(&self) -> Result<Vec<V>, DomainError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.values().cloned().collect())
    }

    fn contains(&self, key: &K) -> Result<bool, DomainError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.contains_key(key))
    }
}
