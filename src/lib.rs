//! Layered Repository
//!
//! A policy-driven repository over many data sources with support for:
//! - Union reads across cache and readable sources
//! - Write fan-out with background cache repopulation
//! - Exponential-backoff retry around unreliable sources
//! - Keyed storage backed caches (in-memory and bounded)

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    CachePolicy, DomainError, Entity, EntityKey, EntityStream, ReadPolicy, Repository,
    RepositoryBuilder, RepositoryPolicies, RequestParams, Retry, RetryConfig, WritePolicy,
};
