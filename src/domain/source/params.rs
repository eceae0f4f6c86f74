//! Opaque request parameters forwarded to data sources

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered name/value pairs passed through the repository untouched
///
/// Typical contents are pagination cursors or filters; only the data
/// sources interpret them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(Map<String, Value>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, keeping insertion order
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
