//! HTTP client wrapper with retry logic.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::config::{CryptoCompareConfig, RetryConfig};
use super::error::CryptoCompareError;
use crate::infrastructure::metrics::{self, ApiEndpoint, Outcome};

/// CryptoCompare REST endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Exchange/pair catalog.
    Exchanges,
    /// Daily history.
    HistoDay,
    /// Latest price.
    Price,
}

impl Endpoint {
    /// Path relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Exchanges => "data/v3/all/exchanges",
            Self::HistoDay => "data/histoday",
            Self::Price => "data/price",
        }
    }

    const fn metric_label(self) -> ApiEndpoint {
        match self {
            Self::Exchanges => ApiEndpoint::Exchanges,
            Self::HistoDay => ApiEndpoint::HistoDay,
            Self::Price => ApiEndpoint::Price,
        }
    }
}

/// HTTP client for the CryptoCompare API with retry logic.
#[derive(Debug, Clone)]
pub struct CryptoCompareHttpClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl CryptoCompareHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &CryptoCompareConfig) -> Result<Self, CryptoCompareError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CryptoCompareError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            retry_config: config.retry.clone(),
        })
    }

    /// GET an endpoint with query parameters and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<T, CryptoCompareError> {
        let url = format!("{}/{}", self.base_url, endpoint.path());
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            let mut request = self.client.get(&url).query(query);
            if let Some(key) = &self.api_key {
                request = request.header("authorization", format!("Apikey {key}"));
            }

            let started = Instant::now();
            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    metrics::record_api_request(
                        endpoint.metric_label(),
                        Outcome::NetworkError,
                        started.elapsed(),
                    );
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if backoff.attempt <= 1 {
                        return Err(CryptoCompareError::Network(e.to_string()));
                    }
                    return Err(CryptoCompareError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| CryptoCompareError::Network(e.to_string()))?;
                metrics::record_api_request(
                    endpoint.metric_label(),
                    Outcome::Success,
                    started.elapsed(),
                );
                return serde_json::from_str(&text)
                    .map_err(|e| CryptoCompareError::JsonParse(e.to_string()));
            }

            metrics::record_api_request(
                endpoint.metric_label(),
                Outcome::HttpError,
                started.elapsed(),
            );

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();
            let error_code = status.as_u16().to_string();

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    if let Some(delay) = backoff.next_backoff() {
                        let delay = retry_after.map_or(delay, Duration::from_secs);
                        tracing::warn!(
                            code = %error_code,
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(CryptoCompareError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            code = %error_code,
                            message = %error_body,
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if backoff.attempt <= 1 {
                        return Err(CryptoCompareError::Api {
                            code: error_code,
                            message: error_body,
                        });
                    }
                    return Err(CryptoCompareError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
                ErrorCategory::NonRetryable => {
                    return Err(CryptoCompareError::Api {
                        code: error_code,
                        message: error_body,
                    });
                }
            }
        }
    }
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Exchanges.path(), "data/v3/all/exchanges");
        assert_eq!(Endpoint::HistoDay.path(), "data/histoday");
        assert_eq!(Endpoint::Price.path(), "data/price");
        assert_eq!(Endpoint::Price.metric_label(), ApiEndpoint::Price);
    }

    fn client_for(server: &MockServer, retry: RetryConfig) -> CryptoCompareHttpClient {
        let config = CryptoCompareConfig::new(server.uri()).with_retry(retry);
        CryptoCompareHttpClient::new(&config).unwrap()
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[test]
    fn categorize_rate_limited() {
        assert!(matches!(
            categorize_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorCategory::RateLimited
        ));
    }

    #[test]
    fn categorize_retryable() {
        assert!(matches!(
            categorize_status(StatusCode::INTERNAL_SERVER_ERROR),
            ErrorCategory::Retryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::BAD_GATEWAY),
            ErrorCategory::Retryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::SERVICE_UNAVAILABLE),
            ErrorCategory::Retryable
        ));
    }

    #[test]
    fn categorize_non_retryable() {
        assert!(matches!(
            categorize_status(StatusCode::BAD_REQUEST),
            ErrorCategory::NonRetryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::NOT_FOUND),
            ErrorCategory::NonRetryable
        ));
    }

    #[test]
    fn exponential_backoff_increments() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        };

        let mut backoff = ExponentialBackoff::new(&config);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert!(backoff.next_backoff().is_none());
    }

    #[test]
    fn exponential_backoff_respects_max() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            multiplier: 10.0,
        };

        let mut backoff = ExponentialBackoff::new(&config);

        backoff.next_backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn single_attempt_never_backs_off() {
        let mut backoff = ExponentialBackoff::new(&RetryConfig::default());
        assert!(backoff.next_backoff().is_none());
        assert_eq!(backoff.attempt, 1);
    }

    #[tokio::test]
    async fn sends_query_and_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/price"))
            .and(query_param("fsym", "BTC"))
            .and(query_param("tsyms", "USD"))
            .and(header("authorization", "Apikey k123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"USD": 1.5})))
            .expect(1)
            .mount(&server)
            .await;

        let config = CryptoCompareConfig::new(server.uri()).with_api_key("k123");
        let client = CryptoCompareHttpClient::new(&config).unwrap();

        let body: serde_json::Value = client
            .get(
                Endpoint::Price,
                &[("fsym", "BTC".to_string()), ("tsyms", "USD".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(body["USD"], 1.5);
    }

    #[tokio::test]
    async fn server_error_without_retries_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, RetryConfig::default());
        let err = client
            .get::<serde_json::Value>(Endpoint::Exchanges, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CryptoCompareError::Api { ref code, .. } if code == "503"));
    }

    #[tokio::test]
    async fn server_error_retried_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_retry(3));
        let err = client
            .get::<serde_json::Value>(Endpoint::HistoDay, &[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CryptoCompareError::MaxRetriesExceeded { attempts: 3 }
        ));
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let client = client_for(&server, RetryConfig::default());
        let err = client
            .get::<serde_json::Value>(Endpoint::Price, &[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CryptoCompareError::RateLimited {
                retry_after_secs: 7
            }
        ));
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server, RetryConfig::default());
        let err = client
            .get::<serde_json::Value>(Endpoint::Price, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CryptoCompareError::JsonParse(_)));
    }
}
