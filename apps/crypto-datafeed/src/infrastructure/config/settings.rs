//! Datafeed settings loaded from environment variables.

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::application::DEFAULT_HISTORY_LIMIT;
use crate::infrastructure::cryptocompare::{CryptoCompareConfig, DEFAULT_BASE_URL, RetryConfig};
use crate::infrastructure::streaming::DEFAULT_POLL_INTERVAL;

/// Streaming settings.
#[derive(Debug, Clone)]
pub struct StreamingSettings {
    /// Delay between price polls.
    pub poll_interval: Duration,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Complete datafeed configuration.
#[derive(Debug, Clone)]
pub struct DatafeedSettings {
    /// CryptoCompare API client settings.
    pub cryptocompare: CryptoCompareConfig,
    /// Maximum bars requested per history call.
    pub history_limit: u32,
    /// Streaming settings.
    pub streaming: StreamingSettings,
    /// Prometheus exporter port (0 = disabled).
    pub metrics_port: u16,
}

impl Default for DatafeedSettings {
    fn default() -> Self {
        Self {
            cryptocompare: CryptoCompareConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            streaming: StreamingSettings::default(),
            metrics_port: 0,
        }
    }
}

impl DatafeedSettings {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable or
    /// out-of-range value. Unset variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let retry_defaults = RetryConfig::default();

        let base_url = lookup("CRYPTOCOMPARE_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = Duration::from_secs(parse_env(
            &lookup,
            "DATAFEED_HTTP_TIMEOUT_SECS",
            defaults.cryptocompare.timeout.as_secs(),
        )?);
        let max_attempts = parse_env(
            &lookup,
            "DATAFEED_MAX_ATTEMPTS",
            retry_defaults.max_attempts,
        )?;
        let history_limit = parse_env(&lookup, "DATAFEED_HISTORY_LIMIT", defaults.history_limit)?;
        let poll_interval = Duration::from_millis(parse_env(
            &lookup,
            "DATAFEED_POLL_INTERVAL_MS",
            duration_millis(defaults.streaming.poll_interval),
        )?);
        let metrics_port = parse_env(&lookup, "DATAFEED_METRICS_PORT", defaults.metrics_port)?;

        require_positive("DATAFEED_HTTP_TIMEOUT_SECS", timeout.as_secs())?;
        require_positive("DATAFEED_MAX_ATTEMPTS", u64::from(max_attempts))?;
        require_positive("DATAFEED_HISTORY_LIMIT", u64::from(history_limit))?;
        require_positive("DATAFEED_POLL_INTERVAL_MS", duration_millis(poll_interval))?;

        let mut cryptocompare = CryptoCompareConfig::new(base_url)
            .with_timeout(timeout)
            .with_retry(RetryConfig {
                max_attempts,
                ..retry_defaults
            });
        if let Some(api_key) = lookup("CRYPTOCOMPARE_API_KEY") {
            cryptocompare = cryptocompare.with_api_key(api_key.trim());
        }

        Ok(Self {
            cryptocompare,
            history_limit,
            streaming: StreamingSettings { poll_interval },
            metrics_port,
        })
    }

    /// Address for the Prometheus exporter, if enabled.
    #[must_use]
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        (self.metrics_port != 0)
            .then(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metrics_port)))
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
    /// Environment variable must be greater than zero.
    #[error("environment variable {0} must be greater than zero")]
    NotPositive(String),
}

fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                })
        }
        _ => Ok(default),
    }
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NotPositive(key.to_string()));
    }
    Ok(())
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
