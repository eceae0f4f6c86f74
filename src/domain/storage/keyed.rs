//! Keyed storage contract

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Synchronous key/value persistence backing a cache data source
///
/// Implementations must be safe to call from blocking worker threads.
#[cfg_attr(test, automock)]
pub trait KeyedStorage<K: Send + Sync + 'static, V: Send + Sync + 'static>: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value
    fn write(&self, key: &K, value: V) -> Result<(), DomainError>;

    /// Reads the value stored under `key`
    fn read_one(&self, key: &K) -> Result<Option<V>, DomainError>;

    /// Removes the value stored under `key`, if any
    fn remove(&self, key: &K) -> Result<(), DomainError>;

    /// Removes every stored value
    fn clear(&self) -> Result<(), DomainError>;

    /// Returns a snapshot of the stored keys; every call takes a fresh one
    fn keys(&self) -> Result<Vec<K>, DomainError>;

    /// Returns a snapshot of the stored values
    fn read_all(&self) -> Result<Vec<V>, DomainError>;

    /// Whether a value is stored under `key`
    fn contains(&self, key: &K) -> Result<bool, DomainError> {
        Ok(self.read_one(key)?.is_some())
    }
}
