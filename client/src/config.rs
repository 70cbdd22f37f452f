//! Client configuration: base URL, timeout, and retry policy.

use std::time::Duration;

use crate::error::ApiError;
use crate::validate;

/// Delay strategy between retried requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry.
    Constant { delay: Duration },
    /// `base * factor^attempt`, capped at `max`.
    Exponential {
        base: Duration,
        factor: u32,
        max: Duration,
    },
}

impl Backoff {
    pub fn constant(delay: Duration) -> Self {
        Backoff::Constant { delay }
    }

    pub fn exponential(base: Duration, factor: u32, max: Duration) -> Self {
        Backoff::Exponential { base, factor, max }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Constant { delay } => delay,
            Backoff::Exponential { base, factor, max } => {
                let scaled = factor
                    .checked_pow(attempt)
                    .and_then(|mul| base.checked_mul(mul))
                    .unwrap_or(max);
                scaled.min(max)
            }
        }
    }
}

impl Default for Backoff {
    /// The server's original client retried on a 10ms constant window.
    fn default() -> Self {
        Backoff::Constant {
            delay: Duration::from_millis(10),
        }
    }
}

/// Immutable configuration for a `BassaClient`.
///
/// `new` validates the base URL shape and rejects a zero timeout before any
/// client is constructed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
    retry_count: u32,
    backoff: Backoff,
}

impl ClientConfig {
    pub fn new(base_url: &str, timeout: Duration, retry_count: u32) -> Result<Self, ApiError> {
        Self::with_backoff(base_url, timeout, retry_count, Backoff::default())
    }

    pub fn with_backoff(
        base_url: &str,
        timeout: Duration,
        retry_count: u32,
        backoff: Backoff,
    ) -> Result<Self, ApiError> {
        if timeout.is_zero() {
            return Err(ApiError::IncompleteParams("timeout"));
        }
        let base_url = validate::check_base_url(base_url)?;
        Ok(Self {
            base_url,
            timeout,
            retry_count,
            backoff,
        })
    }

    /// Base URL with any trailing slash stripped.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extra attempts after the first, not total attempts.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::new("http://localhost", Duration::ZERO, 3).unwrap_err();
        assert!(matches!(err, ApiError::IncompleteParams("timeout")));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let err =
            ClientConfig::new("not a url", Duration::from_secs(5), 3).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let config =
            ClientConfig::new("http://localhost:8080/", Duration::from_secs(5), 3).unwrap();
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn constant_backoff_is_flat() {
        let backoff = Backoff::constant(Duration::from_millis(10));
        assert_eq!(backoff.delay(0), Duration::from_millis(10));
        assert_eq!(backoff.delay(7), Duration::from_millis(10));
    }

    #[test]
    fn exponential_backoff_grows_and_caps() {
        let backoff = Backoff::exponential(
            Duration::from_millis(10),
            2,
            Duration::from_millis(50),
        );
        assert_eq!(backoff.delay(0), Duration::from_millis(10));
        assert_eq!(backoff.delay(1), Duration::from_millis(20));
        assert_eq!(backoff.delay(2), Duration::from_millis(40));
        assert_eq!(backoff.delay(3), Duration::from_millis(50));
        assert_eq!(backoff.delay(30), Duration::from_millis(50));
    }
}
