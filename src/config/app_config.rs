use serde::Deserialize;

use crate::domain::repository::DEFAULT_BUFFER_CAPACITY;
use crate::domain::{CachePolicy, ReadPolicy, RepositoryPolicies, RetryConfig, WritePolicy};
use crate::infrastructure::storage::KeyedStorageConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub repository: RepositoryConfig,
    pub retry: RetryConfig,
    pub cache_store: KeyedStorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Policies and buffering applied to repositories built from configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub read_policy: ReadPolicy,
    pub write_policy: WritePolicy,
    pub cache_policy: CachePolicy,
    pub buffer_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            read_policy: ReadPolicy::default(),
            write_policy: WritePolicy::default(),
            cache_policy: CachePolicy::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl RepositoryConfig {
    pub fn policies(&self) -> RepositoryPolicies {
        RepositoryPolicies::new(self.read_policy, self.write_policy, self.cache_policy)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
