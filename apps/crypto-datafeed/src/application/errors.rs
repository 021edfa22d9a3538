//! Datafeed errors.

use thiserror::Error;

use crate::application::ports::MarketDataError;
use crate::domain::SymbolParseError;

/// Errors reported by datafeed operations.
///
/// "No data in range" is not an error; it is reported through
/// [`HistoryMetadata::no_data`](crate::application::dto::HistoryMetadata).
#[derive(Debug, Clone, Error)]
pub enum DatafeedError {
    /// Symbol is not in the catalog.
    #[error("cannot resolve symbol: {symbol}")]
    SymbolNotFound {
        /// The requested symbol.
        symbol: String,
    },

    /// Symbol name is malformed.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(#[from] SymbolParseError),

    /// Request to the market data provider failed.
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_not_found_message() {
        let err = DatafeedError::SymbolNotFound {
            symbol: "Bitfinex:FOO/BAR".to_string(),
        };
        assert_eq!(err.to_string(), "cannot resolve symbol: Bitfinex:FOO/BAR");
    }

    #[test]
    fn market_data_error_is_transparent() {
        let err: DatafeedError = MarketDataError::ConnectionError {
            message: "refused".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Market data connection error: refused");
    }
}
