//! Entity identity traits

use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::domain::DomainError;

/// Trait for types that identify an entity within a source
pub trait EntityKey: Clone + Debug + Display + Eq + Hash + Send + Sync + 'static {
    /// Returns false when the key carries no identity (e.g. a blank string)
    fn is_defined(&self) -> bool {
        true
    }
}

impl EntityKey for String {
    fn is_defined(&self) -> bool {
        !self.trim().is_empty()
    }
}

macro_rules! integer_keys {
    ($($t:ty),*) => {
        $(impl EntityKey for $t {})*
    };
}

integer_keys!(u32, u64, i32, i64, usize);

/// Trait for values managed by the repository
///
/// Entities are replaced wholesale, never partially mutated, so `Clone`
/// is the only way the repository hands them to several sources.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// The key type for this entity
    type Key: EntityKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;
}

/// Fails with a validation error when `key` is not defined.
pub fn ensure_key_defined<K: EntityKey>(key: &K) -> Result<(), DomainError> {
    if key.is_defined() {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Key must be defined, got {:?}",
            key
        )))
    }
}
