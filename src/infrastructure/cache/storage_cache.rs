//! Cache data source backed by keyed storage

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::trace;

use crate::domain::DomainError;
use crate::domain::source::{
    CacheDataSource, ReadableDataSource, RequestParams, WritableDataSource,
};
use crate::domain::storage::{Entity, KeyedStorage};

/// Adapts synchronous [`KeyedStorage`] to the asynchronous cache contract
///
/// Storage calls run on the blocking thread pool. An entry is valid for as
/// long as the store holds it; expiry, if any, is the store's business.
pub struct StorageCacheDataSource<E: Entity> {
    name: String,
    storage: Arc<dyn KeyedStorage<E::Key, E>>,
}

impl<E: Entity> fmt::Debug for StorageCacheDataSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCacheDataSource")
            .field("name", &self.name)
            .finish()
    }
}

impl<E: Entity> StorageCacheDataSource<E> {
    pub fn new(name: impl Into<String>, storage: Arc<dyn KeyedStorage<E::Key, E>>) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, DomainError>
    where
        F: FnOnce(&dyn KeyedStorage<E::Key, E>) -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .map_err(|e| {
                DomainError::cache(format!("Cache '{}' storage task failed: {}", self.name, e))
            })?
    }

    async fn write_and_confirm(&self, entity: E) -> Result<E, DomainError> {
        let name = self.name.clone();
        self.blocking(move |storage| {
            let key = entity.key().clone();
            storage.write(&key, entity)?;
            storage.read_one(&key)?.ok_or_else(|| {
                DomainError::cache(format!(
                    "Cache '{}' lost entry {} right after writing it",
                    name, key
                ))
            })
        })
        .await
    }
}

#[async_trait]
impl<E: Entity> ReadableDataSource<E> for StorageCacheDataSource<E> {
    async fn get_by_key(
        &self,
        key: &E::Key,
        _params: &RequestParams,
    ) -> Result<Option<E>, DomainError> {
        let key = key.clone();
        let found = self.blocking(move |storage| storage.read_one(&key)).await?;

        if found.is_some() {
            trace!(cache = %self.name, "Cache hit");
        }
        Ok(found)
    }

    async fn get_all(&self, _params: &RequestParams) -> Result<Vec<E>, DomainError> {
        self.blocking(|storage| {
            let mut entities = Vec::new();
            for key in storage.keys()? {
                if let Some(entity) = storage.read_one(&key)? {
                    entities.push(entity);
                }
            }
            Ok(entities)
        })
        .await
    }
}

#[async_trait]
impl<E: Entity> WritableDataSource<E> for StorageCacheDataSource<E> {
    async fn add_or_update(&self, entity: E) -> Result<E, DomainError> {
        self.write_and_confirm(entity).await
    }

    async fn add_or_update_all(
        &self,
        entities: Vec<E>,
        _params: &RequestParams,
    ) -> Result<Vec<E>, DomainError> {
        try_join_all(
            entities
                .into_iter()
                .map(|entity| self.write_and_confirm(entity)),
        )
        .await
    }

    async fn delete_by_key(
        &self,
        key: &E::Key,
        _params: &RequestParams,
    ) -> Result<bool, DomainError> {
        let key = key.clone();
        self.blocking(move |storage| storage.remove(&key)).await?;
        Ok(true)
    }

    async fn delete_all(&self, _params: &RequestParams) -> Result<bool, DomainError> {
        self.blocking(|storage| storage.clear()).await?;
        Ok(true)
    }
}

#[async_trait]
impl<E: Entity> CacheDataSource<E> for StorageCacheDataSource<E> {
    async fn is_valid(&self, entity: &E) -> Result<bool, DomainError> {
        let key = entity.key().clone();
        self.blocking(move |storage| storage.contains(&key)).await
    }
}
