//! Demo command - walks a layered repository through reads, writes and deletes

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use futures::TryStreamExt;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{
    CachePolicy, Entity, ReadPolicy, Repository, RepositoryPolicies, RequestParams, Retry,
    WritePolicy,
};
use crate::infrastructure::cache::StorageCacheDataSource;
use crate::infrastructure::logging;
use crate::infrastructure::source::{InMemoryDataSource, LIMIT_PARAM, RetryingDataSource};
use crate::infrastructure::storage::{KeyedStorageConfig, KeyedStorageFactory};

/// Arguments for the demo command
#[derive(Args, Clone, Debug, Default)]
pub struct DemoArgs {
    /// Key to read, then delete
    #[arg(long, default_value_t = 1)]
    pub key: u64,

    /// Read policy (overrides config)
    #[arg(long)]
    pub read_policy: Option<ReadPolicy>,

    /// Write policy (overrides config)
    #[arg(long)]
    pub write_policy: Option<WritePolicy>,

    /// Cache policy (overrides config)
    #[arg(long)]
    pub cache_policy: Option<CachePolicy>,

    /// Maximum number of entities listed per source
    #[arg(long)]
    pub limit: Option<u64>,
}

/// Entity served by the demo sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
}

impl Article {
    fn new(id: u64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
        }
    }
}

impl Entity for Article {
    type Key = u64;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// What each step of the walkthrough observed
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub policies: RepositoryPolicies,
    pub read: Vec<Article>,
    pub cached_after_read: bool,
    pub written: Option<Article>,
    pub listed: Vec<Article>,
    pub deleted: bool,
    pub cached_after_delete: bool,
}

/// Run the demo walkthrough and print its report as JSON
pub async fn run(args: DemoArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().unwrap_or_default();
    apply_overrides(&mut config, &args);
    logging::init_logging(&config.logging)?;

    let repository = build_repository(&config);
    info!(?repository, "Repository ready");

    let report = walkthrough(&repository, args.key, &request_params(&args)).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &DemoArgs) {
    if let Some(policy) = args.read_policy {
        config.repository.read_policy = policy;
    }
    if let Some(policy) = args.write_policy {
        config.repository.write_policy = policy;
    }
    if let Some(policy) = args.cache_policy {
        config.repository.cache_policy = policy;
    }
}

fn request_params(args: &DemoArgs) -> RequestParams {
    match args.limit {
        Some(limit) => RequestParams::new().with(LIMIT_PARAM, limit),
        None => RequestParams::new(),
    }
}

/// Two readable sources, the first also writable, and two caches
///
/// The mirror overlaps the catalog on purpose so reads show union merging.
pub fn build_repository(config: &AppConfig) -> Repository<Article> {
    let catalog = Arc::new(
        InMemoryDataSource::with_entities(
            "catalog",
            vec![Article::new(1, "Layered caching"), Article::new(2, "Backoff basics")],
        )
        .with_latency(Duration::from_millis(5)),
    );
    let mirror = Arc::new(RetryingDataSource::new(
        InMemoryDataSource::with_entities("mirror", vec![Article::new(1, "Layered caching")]),
        Retry::new(config.retry.clone()),
    ));

    let configured: Arc<StorageCacheDataSource<Article>> = Arc::new(StorageCacheDataSource::new(
        "configured",
        KeyedStorageFactory::create(&config.cache_store),
    ));
    let bounded: Arc<StorageCacheDataSource<Article>> = Arc::new(StorageCacheDataSource::new(
        "bounded",
        KeyedStorageFactory::create(&KeyedStorageConfig::moka(1_000)),
    ));

    Repository::builder()
        .policies(config.repository.policies())
        .buffer_capacity(config.repository.buffer_capacity)
        .add_readable_source(catalog.clone())
        .add_readable_source(mirror)
        .add_writable_source(catalog)
        .add_cache_source(configured)
        .add_cache_source(bounded)
        .build()
}

/// Reads `key`, writes a new article, lists everything, then deletes `key`
pub async fn walkthrough(
    repository: &Repository<Article>,
    key: u64,
    params: &RequestParams,
) -> anyhow::Result<DemoReport> {
    let read: Vec<Article> = repository.get_by_key(&key, params)?.try_collect().await?;
    repository.settle().await;
    let cached_after_read = repository.are_cached(&read).await?;
    info!(key, values = read.len(), cached_after_read, "Read finished");

    let written = repository
        .add_or_update(Article::new(key + 100, "Written through"))
        .await?;
    repository.settle().await;

    let listed = repository.get_all(params).await?;
    info!(listed = listed.len(), "Listed entities");

    let deleted = repository.delete_by_key(&key, params).await?;
    let cached_after_delete = repository.are_cached(&read).await?;
    info!(key, deleted, cached_after_delete, "Delete finished");

    Ok(DemoReport {
        policies: repository.policies(),
        read,
        cached_after_read,
        written,
        listed,
        deleted,
        cached_after_delete,
    })
}
