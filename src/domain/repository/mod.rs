//! Repository domain - Policy-driven orchestration over data sources

mod dispatch;
mod orchestrator;
mod policy;
mod stream;

pub use dispatch::{DEFAULT_BUFFER_CAPACITY, Dispatcher};
pub use orchestrator::{Repository, RepositoryBuilder};
pub use policy::{CachePolicy, ReadPolicy, RepositoryPolicies, WritePolicy};
pub use stream::{Emitter, EntityStream};
