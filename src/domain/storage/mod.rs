//! Storage domain - Entity identity and the keyed storage contract

mod entity;
mod keyed;

pub use entity::{ensure_key_defined, Entity, EntityKey};
pub use keyed::KeyedStorage;

#[cfg(test)]
pub use keyed::MockKeyedStorage;
