//! Repository orchestrator - composes readable, writable and cache sources

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use futures::future::{join_all, try_join_all};
use futures::stream::FuturesUnordered;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::domain::DomainError;
use crate::domain::source::{
    CacheDataSource, ReadableDataSource, RequestParams, WritableDataSource,
};
use crate::domain::storage::{Entity, ensure_key_defined};

use super::dispatch::{DEFAULT_BUFFER_CAPACITY, Dispatcher};
use super::policy::{
    CachePolicy, ReadPolicy, RepositoryPolicies, WritePolicy, fan_out_width,
};
use super::stream::{Emitter, EntityStream};

type Readable<E> = Arc<dyn ReadableDataSource<E>>;
type Writable<E> = Arc<dyn WritableDataSource<E>>;
type Cache<E> = Arc<dyn CacheDataSource<E>>;

/// Policy-driven repository over any number of readable, writable and cache sources
///
/// Reads fan out to every consulted source and merge all answers without
/// deduplication. Successful reads from readable sources and successful
/// writes repopulate caches in the background according to the cache
/// policy; those background writes never fail the originating call.
///
/// Source registries are fixed while calls are in flight: registration
/// takes `&mut self` and every call works on its own snapshot.
pub struct Repository<E: Entity> {
    readable: Vec<Readable<E>>,
    writable: Vec<Writable<E>>,
    caches: Vec<Cache<E>>,
    policies: RepositoryPolicies,
    dispatcher: Dispatcher,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            readable: self.readable.clone(),
            writable: self.writable.clone(),
            caches: self.caches.clone(),
            policies: self.policies,
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("readable", &self.readable.len())
            .field("writable", &self.writable.len())
            .field("caches", &self.caches.len())
            .field("policies", &self.policies)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl<E: Entity> Repository<E> {
    pub fn builder() -> RepositoryBuilder<E> {
        RepositoryBuilder::new()
    }

    pub fn policies(&self) -> RepositoryPolicies {
        self.policies
    }

    pub fn set_read_policy(&mut self, policy: ReadPolicy) {
        self.policies.read = policy;
    }

    pub fn set_write_policy(&mut self, policy: WritePolicy) {
        self.policies.write = policy;
    }

    pub fn set_cache_policy(&mut self, policy: CachePolicy) {
        self.policies.cache = policy;
    }

    /// Returns a repository sharing this one's sources but applying `policies`
    ///
    /// Lets a single call use different policies without touching the
    /// configuration other callers see.
    pub fn with_policies(&self, policies: RepositoryPolicies) -> Self {
        Self {
            policies,
            ..self.clone()
        }
    }

    pub fn add_readable_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = Readable<E>>,
    {
        self.readable.extend(sources);
    }

    pub fn add_writable_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = Writable<E>>,
    {
        self.writable.extend(sources);
    }

    pub fn add_cache_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = Cache<E>>,
    {
        self.caches.extend(sources);
    }

    /// Waits for background cache repopulation started so far
    pub async fn settle(&self) {
        self.dispatcher.settle().await;
    }

    /// Streams every value held under `key` by the sources the read policy selects
    ///
    /// Cache sources are queried first when the policy allows; readable
    /// sources are queried when no cache produced a value. A key nobody
    /// holds yields an empty stream. An undefined key fails before any
    /// source is touched; source failures end the stream with an error.
    pub fn get_by_key(
        &self,
        key: &E::Key,
        params: &RequestParams,
    ) -> Result<EntityStream<E>, DomainError> {
        ensure_key_defined(key)?;

        let repository = self.clone();
        let key = key.clone();
        let params = params.clone();

        self.dispatcher.stream(move |emitter| async move {
            repository.emit_by_key(key, params, emitter).await;
        })
    }

    async fn emit_by_key(self, key: E::Key, params: RequestParams, emitter: Emitter<E>) {
        let policy = self.policies.read;

        if policy.use_cache() {
            let mut hits: FuturesUnordered<_> = self
                .caches
                .iter()
                .map(|cache| cache.get_by_key(&key, &params))
                .collect();
            let mut found = false;

            while let Some(result) = hits.next().await {
                match result {
                    Ok(Some(entity)) => {
                        trace!(%key, "Cache hit");
                        found = true;
                        if !emitter.emit(Ok(entity)) {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(error) => {
                        emitter.emit(Err(error));
                        return;
                    }
                }
            }

            if found || !policy.use_readable() {
                return;
            }
            debug!(%key, "No cache source holds key, querying readable sources");
        }

        let mut reads: FuturesUnordered<_> = self
            .readable
            .iter()
            .map(|source| source.get_by_key(&key, &params))
            .collect();

        while let Some(result) = reads.next().await {
            let item = match result {
                Ok(Some(entity)) => self.repopulate(&entity).map(|()| entity),
                Ok(None) => continue,
                Err(error) => Err(error),
            };
            let failed = item.is_err();

            if !emitter.emit(item) || failed {
                return;
            }
        }
    }

    /// Collects every entity from the sources the read policy selects
    ///
    /// Lists from all consulted sources are concatenated. Readable sources
    /// are queried when the consulted caches are all empty.
    pub async fn get_all(&self, params: &RequestParams) -> Result<Vec<E>, DomainError> {
        let repository = self.clone();
        let params = params.clone();

        self.dispatcher
            .run(async move { repository.collect_all(params).await })
            .await
    }

    async fn collect_all(self, params: RequestParams) -> Result<Vec<E>, DomainError> {
        let policy = self.policies.read;

        if policy.use_cache() {
            let cached = concat(try_join_all(self.caches.iter().map(|c| c.get_all(&params))).await?);

            if !cached.is_empty() || !policy.use_readable() {
                trace!(count = cached.len(), "Serving collection from caches");
                return Ok(cached);
            }
            debug!("Cache sources are empty, querying readable sources");
        }

        let entities =
            concat(try_join_all(self.readable.iter().map(|s| s.get_all(&params))).await?);
        self.repopulate_all(&entities, &params)?;

        Ok(entities)
    }

    /// Writes `entity` to the writable sources the write policy selects
    ///
    /// Resolves once every targeted source has answered and returns the
    /// answer that completed last, or `None` when no writable source is
    /// registered. A failing source fails the call; sources that already
    /// stored the value keep it.
    pub async fn add_or_update(&self, entity: E) -> Result<Option<E>, DomainError> {
        ensure_key_defined(entity.key())?;
        let repository = self.clone();

        self.dispatcher
            .run(async move {
                let targets = repository.write_targets();
                debug!(key = %entity.key(), targets = targets.len(), "Writing entity");

                let writes = targets
                    .iter()
                    .map(|s| s.add_or_update(entity.clone()))
                    .collect();
                let stored = last_completed(writes).await?;

                if let Some(stored) = &stored {
                    repository.repopulate(stored)?;
                }
                Ok(stored)
            })
            .await
    }

    /// Writes every entity to the writable sources the write policy selects
    pub async fn add_or_update_all(
        &self,
        entities: Vec<E>,
        params: &RequestParams,
    ) -> Result<Vec<E>, DomainError> {
        for entity in &entities {
            ensure_key_defined(entity.key())?;
        }
        let repository = self.clone();
        let params = params.clone();

        self.dispatcher
            .run(async move {
                let targets = repository.write_targets();
                debug!(count = entities.len(), targets = targets.len(), "Writing entities");

                let writes = targets
                    .iter()
                    .map(|s| s.add_or_update_all(entities.clone(), &params))
                    .collect();
                let stored = last_completed(writes).await?.unwrap_or_default();

                repository.repopulate_all(&stored, &params)?;
                Ok(stored)
            })
            .await
    }

    /// Deletes `key` from the selected writable sources and from every cache
    ///
    /// Caches are purged whatever the cache policy so no stale copy
    /// outlives an authoritative delete. Returns the answer of the writable
    /// source that completed last, or false when none is registered.
    pub async fn delete_by_key(
        &self,
        key: &E::Key,
        params: &RequestParams,
    ) -> Result<bool, DomainError> {
        ensure_key_defined(key)?;
        let repository = self.clone();
        let key = key.clone();
        let params = params.clone();

        self.dispatcher
            .run(async move {
                let targets = repository.write_targets();
                debug!(%key, targets = targets.len(), "Deleting entity");

                let deletes = targets
                    .iter()
                    .map(|s| s.delete_by_key(&key, &params))
                    .collect();
                let deleted = last_completed(deletes).await?.unwrap_or(false);

                try_join_all(repository.caches.iter().map(|c| c.delete_by_key(&key, &params)))
                    .await?;
                Ok(deleted)
            })
            .await
    }

    /// Deletes everything from the selected writable sources and from every cache
    pub async fn delete_all(&self, params: &RequestParams) -> Result<bool, DomainError> {
        let repository = self.clone();
        let params = params.clone();

        self.dispatcher
            .run(async move {
                let targets = repository.write_targets();
                debug!(targets = targets.len(), "Deleting all entities");

                let deletes = targets.iter().map(|s| s.delete_all(&params)).collect();
                let deleted = last_completed(deletes).await?.unwrap_or(false);

                try_join_all(repository.caches.iter().map(|c| c.delete_all(&params))).await?;
                Ok(deleted)
            })
            .await
    }

    /// Whether any cache source holds a valid copy of `entity`
    pub async fn is_cached(&self, entity: &E) -> Result<bool, DomainError> {
        self.are_cached(std::slice::from_ref(entity)).await
    }

    /// Whether any cache source holds a valid copy of any of `entities`
    ///
    /// This is an OR over every (entity, cache) pair: a batch counts as
    /// cached as soon as one member is valid in one cache. It does not
    /// mean every member is cached everywhere.
    pub async fn are_cached(&self, entities: &[E]) -> Result<bool, DomainError> {
        for entity in entities {
            ensure_key_defined(entity.key())?;
        }
        let repository = self.clone();
        let entities = entities.to_vec();

        self.dispatcher
            .run(async move {
                let checks = entities
                    .iter()
                    .flat_map(|entity| repository.caches.iter().map(move |c| c.is_valid(entity)));

                Ok(try_join_all(checks).await?.into_iter().any(|valid| valid))
            })
            .await
    }

    fn write_targets(&self) -> &[Writable<E>] {
        let once = self.policies.write == WritePolicy::WriteOnce;
        &self.writable[..fan_out_width(once, self.writable.len())]
    }

    fn cache_targets(&self) -> &[Cache<E>] {
        match self.policies.cache {
            CachePolicy::CacheNever => &[],
            CachePolicy::CacheOnce => &self.caches[..fan_out_width(true, self.caches.len())],
            CachePolicy::CacheAll => &self.caches,
        }
    }

    /// Writes `entity` to the cache targets in the background
    ///
    /// Only failing to start the background task is reported; failed
    /// cache writes are logged and dropped.
    fn repopulate(&self, entity: &E) -> Result<(), DomainError> {
        let targets = self.cache_targets().to_vec();
        if targets.is_empty() {
            return Ok(());
        }
        let entity = entity.clone();

        self.dispatcher.detach(async move {
            let writes = targets.iter().map(|cache| cache.add_or_update(entity.clone()));

            for result in join_all(writes).await {
                if let Err(error) = result {
                    warn!(key = %entity.key(), error = %error, "Failed to repopulate cache");
                }
            }
        })
    }

    fn repopulate_all(&self, entities: &[E], params: &RequestParams) -> Result<(), DomainError> {
        let targets = self.cache_targets().to_vec();
        if targets.is_empty() || entities.is_empty() {
            return Ok(());
        }
        let entities = entities.to_vec();
        let params = params.clone();

        self.dispatcher.detach(async move {
            let writes = targets
                .iter()
                .map(|cache| cache.add_or_update_all(entities.clone(), &params));

            for result in join_all(writes).await {
                if let Err(error) = result {
                    warn!(count = entities.len(), error = %error, "Failed to repopulate cache");
                }
            }
        })
    }
}

/// Awaits every operation concurrently, keeping the output that completed last
///
/// Callers collect the operations first; a lazy map over borrowed sources
/// held across an await makes the spawned task's future not `Send`.
async fn last_completed<T, F>(mut pending: FuturesUnordered<F>) -> Result<Option<T>, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    let mut last = None;

    while let Some(result) = pending.next().await {
        last = Some(result?);
    }

    Ok(last)
}

fn concat<E>(lists: Vec<Vec<E>>) -> Vec<E> {
    lists.into_iter().flatten().collect()
}

/// Configures a [`Repository`] before first use
pub struct RepositoryBuilder<E: Entity> {
    readable: Vec<Readable<E>>,
    writable: Vec<Writable<E>>,
    caches: Vec<Cache<E>>,
    policies: RepositoryPolicies,
    runtime: Option<Handle>,
    buffer_capacity: usize,
}

impl<E: Entity> Default for RepositoryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> RepositoryBuilder<E> {
    pub fn new() -> Self {
        Self {
            readable: Vec::new(),
            writable: Vec::new(),
            caches: Vec::new(),
            policies: RepositoryPolicies::default(),
            runtime: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    pub fn policies(mut self, policies: RepositoryPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
        self.policies.read = policy;
        self
    }

    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.policies.write = policy;
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policies.cache = policy;
        self
    }

    /// Runtime source work is spawned on; defaults to the caller's runtime
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Maximum pending items of a `get_by_key` stream before it fails
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn add_readable_source<S>(mut self, source: Arc<S>) -> Self
    where
        S: ReadableDataSource<E> + 'static,
    {
        self.readable.push(source);
        self
    }

    pub fn add_writable_source<S>(mut self, source: Arc<S>) -> Self
    where
        S: WritableDataSource<E> + 'static,
    {
        self.writable.push(source);
        self
    }

    pub fn add_cache_source<S>(mut self, source: Arc<S>) -> Self
    where
        S: CacheDataSource<E> + 'static,
    {
        self.caches.push(source);
        self
    }

    pub fn add_readable_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Readable<E>>,
    {
        self.readable.extend(sources);
        self
    }

    pub fn add_writable_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Writable<E>>,
    {
        self.writable.extend(sources);
        self
    }

    pub fn add_cache_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Cache<E>>,
    {
        self.caches.extend(sources);
        self
    }

    pub fn build(self) -> Repository<E> {
        debug!(
            readable = self.readable.len(),
            writable = self.writable.len(),
            caches = self.caches.len(),
            read_policy = %self.policies.read,
            write_policy = %self.policies.write,
            cache_policy = %self.policies.cache,
            "Building repository"
        );

        Repository {
            readable: self.readable,
            writable: self.writable,
            caches: self.caches,
            policies: self.policies,
            dispatcher: Dispatcher::new(self.runtime, self.buffer_capacity),
        }
    }
}
