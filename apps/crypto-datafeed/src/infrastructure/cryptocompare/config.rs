//! CryptoCompare adapter configuration.

use std::fmt;
use std::time::Duration;

/// Public CryptoCompare API base URL.
pub const DEFAULT_BASE_URL: &str = "https://min-api.cryptocompare.com";

/// Configuration for the CryptoCompare adapter.
#[derive(Clone)]
pub struct CryptoCompareConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Optional API key, sent as `authorization: Apikey <key>`.
    pub api_key: Option<String>,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy configuration.
    pub retry: RetryConfig,
}

impl Default for CryptoCompareConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl CryptoCompareConfig {
    /// Create a configuration for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Set the API key. Empty keys are ignored.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for CryptoCompareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoCompareConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Retry configuration.
///
/// `max_attempts` counts the first request, so the default of 1 never
/// retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}
