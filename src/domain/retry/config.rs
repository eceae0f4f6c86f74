//! Retry configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds of the exponential backoff applied by [`super::Retry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay unit; the n-th failure waits `2^n` units
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay before retrying after the `failure`-th failure (1-indexed)
    pub fn delay_for_failure(&self, failure: u32) -> Duration {
        let factor = 2u32.checked_pow(failure).unwrap_or(u32::MAX);
        self.base_delay().saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_delay_doubles_per_failure() {
        let config = RetryConfig::new(5).with_base_delay(Duration::from_millis(10));

        assert_eq!(config.delay_for_failure(1), Duration::from_millis(20));
        assert_eq!(config.delay_for_failure(2), Duration::from_millis(40));
        assert_eq!(config.delay_for_failure(3), Duration::from_millis(80));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let config = RetryConfig::new(64).with_base_delay(Duration::from_secs(1));
        assert_eq!(
            config.delay_for_failure(40),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RetryConfig = serde_json::from_str(r#"{"max_retries": 1}"#).unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.base_delay_ms, 100);
    }
}
