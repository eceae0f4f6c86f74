//! Data source decorator applying retry with exponential backoff

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::retry::Retry;
use crate::domain::source::{
    CacheDataSource, ReadableDataSource, RequestParams, WritableDataSource,
};
use crate::domain::storage::Entity;

/// Wraps a data source so every call goes through a [`Retry`]
///
/// Each call starts with a fresh failure count.
#[derive(Debug)]
pub struct RetryingDataSource<S> {
    inner: S,
    retry: Retry,
}

impl<S> RetryingDataSource<S> {
    pub fn new(inner: S, retry: Retry) -> Self {
        Self { inner, retry }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<E, S> ReadableDataSource<E> for RetryingDataSource<S>
where
    E: Entity,
    S: ReadableDataSource<E>,
{
    async fn get_by_key(
        &self,
        key: &E::Key,
        params: &RequestParams,
    ) -> Result<Option<E>, DomainError> {
        self.retry.run(|| self.inner.get_by_key(key, params)).await
    }

    async fn get_all(&self, params: &RequestParams) -> Result<Vec<E>, DomainError> {
        self.retry.run(|| self.inner.get_all(params)).await
    }
}

#[async_trait]
impl<E, S> WritableDataSource<E> for RetryingDataSource<S>
where
    E: Entity,
    S: WritableDataSource<E>,
{
    async fn add_or_update(&self, entity: E) -> Result<E, DomainError> {
        self.retry
            .run(|| self.inner.add_or_update(entity.clone()))
            .await
    }

    async fn add_or_update_all(
        &self,
        entities: Vec<E>,
        params: &RequestParams,
    ) -> Result<Vec<E>, DomainError> {
        self.retry
            .run(|| self.inner.add_or_update_all(entities.clone(), params))
            .await
    }

    async fn delete_by_key(
        &self,
        key: &E::Key,
        params: &RequestParams,
    ) -> Result<bool, DomainError> {
        self.retry.run(|| self.inner.delete_by_key(key, params)).await
    }

    async fn delete_all(&self, params: &RequestParams) -> Result<bool, DomainError> {
        self.retry.run(|| self.inner.delete_all(params)).await
    }
}

#[async_trait]
impl<E, S> CacheDataSource<E> for RetryingDataSource<S>
where
    E: Entity,
    S: CacheDataSource<E>,
{
    async fn is_valid(&self, entity: &E) -> Result<bool, DomainError> {
        self.retry.run(|| self.inner.is_valid(entity)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retry::RetryConfig;
    use crate::domain::source::mock::{Item, MockDataSource};
    use std::time::Duration;

    fn retry(max_retries: u32) -> Retry {
        Retry::new(RetryConfig::new(max_retries).with_base_delay(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let source = RetryingDataSource::new(
            MockDataSource::new("flaky")
                .with_entity(Item::new(1, "one"))
                .with_transient_failures(2),
            retry(3),
        );

        let found = source.get_by_key(&1, &RequestParams::new()).await.unwrap();

        assert_eq!(found, Some(Item::new(1, "one")));
        assert_eq!(source.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let source = RetryingDataSource::new(
            MockDataSource::<Item>::new("flaky").with_transient_failures(2),
            retry(1),
        );

        let result = source.get_all(&RequestParams::new()).await;

        assert!(matches!(result, Err(DomainError::Unavailable { .. })));
        assert_eq!(source.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let source = RetryingDataSource::new(
            MockDataSource::<Item>::new("broken").with_error("bad request"),
            retry(5),
        );

        let result = source.add_or_update(Item::new(1, "one")).await;

        assert!(matches!(result, Err(DomainError::Source { .. })));
        assert_eq!(source.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_write_is_replayed_with_same_entity() {
        let source = RetryingDataSource::new(
            MockDataSource::<Item>::new("flaky").with_transient_failures(1),
            retry(2),
        );

        let stored = source.add_or_update(Item::new(7, "seven")).await.unwrap();

        assert_eq!(stored, Item::new(7, "seven"));
        assert_eq!(source.inner().stored(&7), Some(Item::new(7, "seven")));
    }

    #[tokio::test]
    async fn test_each_call_gets_fresh_retry_budget() {
        let source = RetryingDataSource::new(
            MockDataSource::<Item>::new("flaky").with_transient_failures(3),
            retry(1),
        );
        let params = RequestParams::new();

        assert!(source.delete_all(&params).await.is_err());
        assert!(source.delete_all(&params).await.is_ok());
    }
}
