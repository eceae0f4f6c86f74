use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Data source error: {source_name} - {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Temporarily unavailable: {message}")]
    Unavailable { message: String },

    #[error("Emission buffer exceeded {capacity} pending items")]
    BufferOverflow { capacity: usize },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn buffer_overflow(capacity: usize) -> Self {
        Self::BufferOverflow { capacity }
    }

    /// Whether a later attempt of the same operation may succeed.
    ///
    /// Used as the default predicate of the retry decorator.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Key must be defined");
        assert_eq!(error.to_string(), "Validation error: Key must be defined");
    }

    #[test]
    fn test_source_error() {
        let error = DomainError::source("remote", "connection reset");
        assert_eq!(
            error.to_string(),
            "Data source error: remote - connection reset"
        );
    }

    #[test]
    fn test_buffer_overflow_error() {
        let error = DomainError::buffer_overflow(10_000);
        assert_eq!(
            error.to_string(),
            "Emission buffer exceeded 10000 pending items"
        );
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(DomainError::unavailable("503").is_transient());
        assert!(!DomainError::storage("disk full").is_transient());
        assert!(!DomainError::validation("bad key").is_transient());
    }
}
