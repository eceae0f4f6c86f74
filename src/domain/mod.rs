//! Domain layer - Contracts, policies and orchestration

pub mod error;
pub mod repository;
pub mod retry;
pub mod source;
pub mod storage;

pub use error::DomainError;
pub use repository::{
    CachePolicy, EntityStream, ReadPolicy, Repository, RepositoryBuilder, RepositoryPolicies,
    WritePolicy,
};
pub use retry::{Retry, RetryConfig, RetryPredicate};
pub use source::{CacheDataSource, ReadableDataSource, RequestParams, WritableDataSource};
pub use storage::{Entity, EntityKey, KeyedStorage};
