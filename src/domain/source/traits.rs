//! Data source trait definitions

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::storage::Entity;

use super::RequestParams;

/// A source entities can be read from, typically a remote service
#[async_trait]
pub trait ReadableDataSource<E: Entity>: Send + Sync {
    /// Retrieves an entity by its key
    async fn get_by_key(
        &self,
        key: &E::Key,
        params: &RequestParams,
    ) -> Result<Option<E>, DomainError>;

    /// Retrieves every entity matching `params`
    async fn get_all(&self, params: &RequestParams) -> Result<Vec<E>, DomainError>;
}

/// A source entities can be persisted to or removed from
#[async_trait]
pub trait WritableDataSource<E: Entity>: Send + Sync {
    /// Inserts or replaces an entity, returning the stored value
    async fn add_or_update(&self, entity: E) -> Result<E, DomainError>;

    /// Inserts or replaces several entities
    async fn add_or_update_all(
        &self,
        entities: Vec<E>,
        params: &RequestParams,
    ) -> Result<Vec<E>, DomainError>;

    /// Deletes an entity by its key
    async fn delete_by_key(&self, key: &E::Key, params: &RequestParams)
    -> Result<bool, DomainError>;

    /// Deletes every entity
    async fn delete_all(&self, params: &RequestParams) -> Result<bool, DomainError>;
}

/// A local, fast source used to avoid querying readable sources
#[async_trait]
pub trait CacheDataSource<E: Entity>: ReadableDataSource<E> + WritableDataSource<E> {
    /// Whether the cached copy of `entity` may be served
    async fn is_valid(&self, entity: &E) -> Result<bool, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Entity used across the crate's tests
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Item {
        pub id: u64,
        pub name: String,
    }

    impl Item {
        pub fn new(id: u64, name: &str) -> Self {
            Self {
                id,
                name: name.to_string(),
            }
        }
    }

    impl Entity for Item {
        type Key = u64;

        fn key(&self) -> &Self::Key {
            &self.id
        }
    }

    /// Mock data source playing any of the readable, writable or cache roles
    #[derive(Debug)]
    pub struct MockDataSource<E: Entity> {
        name: String,
        entities: Mutex<HashMap<E::Key, E>>,
        error: Mutex<Option<String>>,
        write_error: Mutex<Option<String>>,
        transient_failures: AtomicU32,
        delay: Mutex<Option<Duration>>,
        calls: AtomicUsize,
    }

    impl<E: Entity> MockDataSource<E> {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                entities: Mutex::new(HashMap::new()),
                error: Mutex::new(None),
                write_error: Mutex::new(None),
                transient_failures: AtomicU32::new(0),
                delay: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_entity(self, entity: E) -> Self {
            self.entities
                .lock()
                .unwrap()
                .insert(entity.key().clone(), entity);
            self
        }

        /// Every call fails with a source error
        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.error.lock().unwrap() = Some(error.into());
            self
        }

        /// Mutating calls fail with a source error, reads succeed
        pub fn with_write_error(self, error: impl Into<String>) -> Self {
            *self.write_error.lock().unwrap() = Some(error.into());
            self
        }

        /// The next `count` calls fail with a transient error
        pub fn with_transient_failures(self, count: u32) -> Self {
            self.transient_failures.store(count, Ordering::SeqCst);
            self
        }

        /// Every call sleeps for `delay` before answering
        pub fn with_delay(self, delay: Duration) -> Self {
            *self.delay.lock().unwrap() = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn stored(&self, key: &E::Key) -> Option<E> {
            self.entities.lock().unwrap().get(key).cloned()
        }

        pub fn len(&self) -> usize {
            self.entities.lock().unwrap().len()
        }

        async fn enter(&self, writing: bool) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(DomainError::unavailable(format!("{} is busy", self.name)));
            }

            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::source(&self.name, error));
            }

            if writing {
                if let Some(error) = self.write_error.lock().unwrap().clone() {
                    return Err(DomainError::source(&self.name, error));
                }
            }

            Ok(())
        }
    }

    #[async_trait]
    impl<E: Entity> ReadableDataSource<E> for MockDataSource<E> {
        async fn get_by_key(
            &self,
            key: &E::Key,
            _params: &RequestParams,
        ) -> Result<Option<E>, DomainError> {
            self.enter(false).await?;
            Ok(self.stored(key))
        }

        async fn get_all(&self, _params: &RequestParams) -> Result<Vec<E>, DomainError> {
            self.enter(false).await?;
            Ok(self.entities.lock().unwrap().values().cloned().collect())
        }
    }

    #[async_trait]
    impl<E: Entity> WritableDataSource<E> for MockDataSource<E> {
        async fn add_or_update(&self, entity: E) -> Result<E, DomainError> {
            self.enter(true).await?;
            self.entities
                .lock()
                .unwrap()
                .insert(entity.key().clone(), entity.clone());
            Ok(entity)
        }

        async fn add_or_update_all(
            &self,
            entities: Vec<E>,
            _params: &RequestParams,
        ) -> Result<Vec<E>, DomainError> {
            self.enter(true).await?;
            let mut stored = self.entities.lock().unwrap();
            for entity in &entities {
                stored.insert(entity.key().clone(), entity.clone());
            }
            Ok(entities)
        }

        async fn delete_by_key(
            &self,
            key: &E::Key,
            _params: &RequestParams,
        ) -> Result<bool, DomainError> {
            self.enter(true).await?;
            Ok(self.entities.lock().unwrap().remove(key).is_some())
        }

        async fn delete_all(&self, _params: &RequestParams) -> Result<bool, DomainError> {
            self.enter(true).await?;
            self.entities.lock().unwrap().clear();
            Ok(true)
        }
    }

    #[async_trait]
    impl<E: Entity> CacheDataSource<E> for MockDataSource<E> {
        async fn is_valid(&self, entity: &E) -> Result<bool, DomainError> {
            self.enter(false).await?;
            Ok(self.entities.lock().unwrap().contains_key(entity.key()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_source_round_trip() {
            let source = MockDataSource::new("mock");
            let params = RequestParams::new();

            source.add_or_update(Item::new(1, "one")).await.unwrap();

            let found = source.get_by_key(&1, &params).await.unwrap();
            assert_eq!(found, Some(Item::new(1, "one")));
            assert_eq!(source.calls(), 2);
        }

        #[tokio::test]
        async fn test_mock_source_transient_failures_run_out() {
            let source: MockDataSource<Item> =
                MockDataSource::new("flaky").with_transient_failures(1);
            let params = RequestParams::new();

            let first = source.get_all(&params).await;
            assert!(first.unwrap_err().is_transient());
            assert!(source.get_all(&params).await.is_ok());
        }

        #[tokio::test]
        async fn test_mock_source_write_error_spares_reads() {
            let source = MockDataSource::new("ro")
                .with_entity(Item::new(1, "one"))
                .with_write_error("read only");
            let params = RequestParams::new();

            assert!(source.get_by_key(&1, &params).await.unwrap().is_some());
            assert!(source.delete_by_key(&1, &params).await.is_err());
        }
    }
}
