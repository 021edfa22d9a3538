//! CryptoCompare-specific error types.

use thiserror::Error;

use crate::application::ports::MarketDataError;

/// Errors from the CryptoCompare adapter.
#[derive(Debug, Error, Clone)]
pub enum CryptoCompareError {
    /// HTTP client could not be built or the request was malformed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned an error.
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status or provider error code.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl From<CryptoCompareError> for MarketDataError {
    fn from(err: CryptoCompareError) -> Self {
        match err {
            CryptoCompareError::Http(message) | CryptoCompareError::Network(message) => {
                Self::ConnectionError { message }
            }
            CryptoCompareError::JsonParse(message) => Self::ApiError {
                message: format!("invalid response: {message}"),
            },
            CryptoCompareError::Api { code, message } => Self::ApiError {
                message: format!("{code}: {message}"),
            },
            CryptoCompareError::RateLimited { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            CryptoCompareError::MaxRetriesExceeded { attempts } => Self::ConnectionError {
                message: format!("Max retries exceeded after {attempts} attempts"),
            },
        }
    }
}
