//! Read, write and cache policies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Which source roles a read consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Only cache sources
    CacheOnly,
    /// Only readable sources
    ReadableOnly,
    /// Cache sources first, readable sources when no cache holds a value
    #[default]
    ReadAll,
}

impl ReadPolicy {
    pub fn use_cache(self) -> bool {
        matches!(self, Self::CacheOnly | Self::ReadAll)
    }

    pub fn use_readable(self) -> bool {
        matches!(self, Self::ReadableOnly | Self::ReadAll)
    }
}

/// How many writable sources a write reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// The first registered writable source
    WriteOnce,
    /// Every registered writable source
    #[default]
    WriteAll,
}

/// How many cache sources are repopulated after a read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    CacheNever,
    /// The first registered cache source
    CacheOnce,
    #[default]
    CacheAll,
}

/// The three independent policies a repository applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryPolicies {
    pub read: ReadPolicy,
    pub write: WritePolicy,
    pub cache: CachePolicy,
}

impl RepositoryPolicies {
    pub fn new(read: ReadPolicy, write: WritePolicy, cache: CachePolicy) -> Self {
        Self { read, write, cache }
    }
}

/// Number of sources, out of `registered`, a ONCE or ALL policy targets
pub(crate) fn fan_out_width(once: bool, registered: usize) -> usize {
    if once { registered.min(1) } else { registered }
}

macro_rules! policy_names {
    ($policy:ident { $($variant:ident => $name:literal),* $(,)? }) => {
        impl fmt::Display for $policy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $name),)*
                }
            }
        }

        impl FromStr for $policy {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().replace('-', "_").as_str() {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(DomainError::configuration(format!(
                        "Unknown {}: {}. Valid values: {}",
                        stringify!($policy),
                        s,
                        [$($name),*].join(", ")
                    ))),
                }
            }
        }
    };
}

policy_names!(ReadPolicy {
    CacheOnly => "cache_only",
    ReadableOnly => "readable_only",
    ReadAll => "read_all",
});

policy_names!(WritePolicy {
    WriteOnce => "write_once",
    WriteAll => "write_all",
});

policy_names!(CachePolicy {
    CacheNever => "cache_never",
    CacheOnce => "cache_once",
    CacheAll => "cache_all",
});
