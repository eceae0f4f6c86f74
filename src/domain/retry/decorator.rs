//! Retry decorator for fallible async operations

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::domain::DomainError;

use super::RetryConfig;

/// Decides whether a failure is worth another attempt
pub type RetryPredicate = Arc<dyn Fn(&DomainError) -> bool + Send + Sync>;

/// Re-runs an operation with exponential backoff while it fails transiently
///
/// On the n-th failure (1-indexed) the operation is started again from
/// scratch after `2^n * base_delay`, provided the predicate accepts the
/// error and `n <= max_retries`. Otherwise that failure is returned. The
/// failure count belongs to a single [`Retry::run`] call.
#[derive(Clone)]
pub struct Retry {
    config: RetryConfig,
    should_retry: RetryPredicate,
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("config", &self.config)
            .finish()
    }
}

impl Retry {
    /// Retries errors for which [`DomainError::is_transient`] holds
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            should_retry: Arc::new(DomainError::is_transient),
        }
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&DomainError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` until it succeeds or the failure is terminal
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut failures = 0u32;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            failures += 1;

            if failures > self.config.max_retries || !(self.should_retry)(&error) {
                return Err(error);
            }

            let delay = self.config.delay_for_failure(failures);
            debug!(
                failure = failures,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after failure"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
