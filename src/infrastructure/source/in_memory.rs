//! In-memory readable and writable data source

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::source::{ReadableDataSource, RequestParams, WritableDataSource};
use crate::domain::storage::Entity;

/// Request parameter capping the number of entities `get_all` returns
pub const LIMIT_PARAM: &str = "limit";

/// Thread-safe in-memory data source
///
/// Stands in for a remote service in tests and demos. An optional latency is
/// applied to every call.
#[derive(Debug)]
pub struct InMemoryDataSource<E: Entity> {
    name: String,
    entities: RwLock<HashMap<E::Key, E>>,
    latency: Option<Duration>,
}

impl<E: Entity> InMemoryDataSource<E> {
    /// Creates a new empty source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: RwLock::new(HashMap::new()),
            latency: None,
        }
    }

    /// Creates a source pre-populated with entities
    ///
    /// A later entity replaces an earlier one with the same key.
    pub fn with_entities(name: impl Into<String>, entities: Vec<E>) -> Self {
        let entities = entities
            .into_iter()
            .map(|entity| (entity.key().clone(), entity))
            .collect();

        Self {
            name: name.into(),
            entities: RwLock::new(entities),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lock_error(&self, e: impl std::fmt::Display) -> DomainError {
        DomainError::source(&self.name, format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl<E: Entity> ReadableDataSource<E> for InMemoryDataSource<E> {
    async fn get_by_key(
        &self,
        key: &E::Key,
        _params: &RequestParams,
    ) -> Result<Option<E>, DomainError> {
        self.simulate_latency().await;

        let entities = self.entities.read().map_err(|e| self.lock_error(e))?;
        Ok(entities.get(key).cloned())
    }

    async fn get_all(&self, params: &RequestParams) -> Result<Vec<E>, DomainError> {
        self.simulate_latency().await;

        let limit = params.get(LIMIT_PARAM).map(parse_limit).transpose()?;

        let entities = self.entities.read().map_err(|e| self.lock_error(e))?;
        let all = entities.values().cloned();

        Ok(match limit {
            Some(limit) => all.take(limit).collect(),
            None => all.collect(),
        })
    }
}

fn parse_limit(value: &serde_json::Value) -> Result<usize, DomainError> {
    value
        .as_u64()
        .and_then(|limit| usize::try_from(limit).ok())
        .ok_or_else(|| {
            DomainError::validation(format!(
                "'{}' must be a non-negative integer, got {}",
                LIMIT_PARAM, value
            ))
        })
}

#[async_trait]
impl<E: Entity> WritableDataSource<E> for InMemoryDataSource<E> {
    async fn add_or_update(&self, entity: E) -> Result<E, DomainError> {
        self.simulate_latency().await;

        let mut entities = self.entities.write().map_err(|e| self.lock_error(e))?;
        entities.insert(entity.key().clone(), entity.clone());
        Ok(entity)
    }

    async fn add_or_update_all(
        &self,
        entities: Vec<E>,
        _params: &RequestParams,
    ) -> Result<Vec<E>, DomainError> {
        self.simulate_latency().await;

        let mut stored = self.entities.write().map_err(|e| self.lock_error(e))?;
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
        self.simulate_latency().await;

        let mut entities = self.entities.write().map_err(|e| self.lock_error(e))?;
        Ok(entities.remove(key).is_some())
    }

    async fn delete_all(&self, _params: &RequestParams) -> Result<bool, DomainError> {
        self.simulate_latency().await;

        let mut entities = self.entities.write().map_err(|e| self.lock_error(e))?;
        entities.clear();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::mock::Item;

    #[tokio::test]
    async fn test_add_then_get_by_key() {
        let source = InMemoryDataSource::new("remote");
        let params = RequestParams::new();

        source.add_or_update(Item::new(1, "one")).await.unwrap();

        let found = source.get_by_key(&1, &params).await.unwrap();
        assert_eq!(found, Some(Item::new(1, "one")));
        assert_eq!(source.get_by_key(&2, &params).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_all_honours_limit() {
        let source = InMemoryDataSource::with_entities(
            "remote",
            vec![Item::new(1, "a"), Item::new(2, "b"), Item::new(3, "c")],
        );

        let all = source.get_all(&RequestParams::new()).await.unwrap();
        assert_eq!(all.len(), 3);

        let params = RequestParams::new().with(LIMIT_PARAM, 2);
        let limited = source.get_all(&params).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_get_all_rejects_malformed_limit() {
        let source: InMemoryDataSource<Item> = InMemoryDataSource::new("remote");
        let params = RequestParams::new().with(LIMIT_PARAM, "ten");

        let result = source.get_all(&params).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_get_all_rejects_negative_limit() {
        let source = InMemoryDataSource::with_entities("remote", vec![Item::new(1, "a")]);
        let params = RequestParams::new().with(LIMIT_PARAM, -1);

        let result = source.get_all(&params).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_limit_larger_than_source_returns_everything() {
        let source = InMemoryDataSource::with_entities(
            "remote",
            vec![Item::new(1, "a"), Item::new(2, "b")],
        );
        let params = RequestParams::new().with(LIMIT_PARAM, u32::MAX);

        assert_eq!(source.get_all(&params).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seeded_entities_are_keyed_with_last_one_winning() {
        let source = InMemoryDataSource::with_entities(
            "remote",
            vec![Item::new(1, "old"), Item::new(2, "b"), Item::new(1, "new")],
        );
        let params = RequestParams::new();

        assert_eq!(source.get_all(&params).await.unwrap().len(), 2);
        assert_eq!(
            source.get_by_key(&1, &params).await.unwrap(),
            Some(Item::new(1, "new"))
        );
    }

    #[tokio::test]
    async fn test_delete_reports_whether_entity_existed() {
        let source = InMemoryDataSource::with_entities("remote", vec![Item::new(1, "a")]);
        let params = RequestParams::new();

        assert!(source.delete_by_key(&1, &params).await.unwrap());
        assert!(!source.delete_by_key(&1, &params).await.unwrap());
        assert!(source.delete_all(&params).await.unwrap());
    }
}
