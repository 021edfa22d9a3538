//! Market Data Port (Driven Port)
//!
//! Interface for fetching the pair catalog, daily history and latest prices
//! from an external market data provider.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ParsedSymbol};

/// Tradable pairs per exchange: exchange → base asset → quote assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeCatalog {
    exchanges: HashMap<String, BTreeMap<String, Vec<String>>>,
}

impl ExchangeCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exchange, possibly without any pairs.
    pub fn insert_exchange(&mut self, exchange: impl Into<String>) {
        self.exchanges.entry(exchange.into()).or_default();
    }

    /// Add the quote assets available for `from_symbol` on `exchange`.
    pub fn insert_pairs(
        &mut self,
        exchange: impl Into<String>,
        from_symbol: impl Into<String>,
        to_symbols: impl IntoIterator<Item = String>,
    ) {
        let quotes = self
            .exchanges
            .entry(exchange.into())
            .or_default()
            .entry(from_symbol.into())
            .or_default();
        quotes.extend(to_symbols);
        quotes.sort();
        quotes.dedup();
    }

    /// Pairs listed for an exchange, ordered by base asset.
    #[must_use]
    pub fn pairs(&self, exchange: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.exchanges.get(exchange)
    }

    /// Number of exchanges in the catalog.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }
}

/// Parameters of a daily history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Pair to fetch.
    pub symbol: ParsedSymbol,
    /// Last bar time to include (Unix seconds).
    pub to_ts: i64,
    /// Maximum number of bars.
    pub limit: u32,
}

/// A bar as returned by the provider, timestamped in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    /// Bar open time (Unix seconds).
    pub time: i64,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Volume in base asset units, when reported.
    pub volume: Option<f64>,
}

impl HistoricalBar {
    /// Convert to a chart bar (milliseconds).
    ///
    /// Out-of-range provider timestamps saturate instead of overflowing.
    #[must_use]
    pub const fn to_bar(&self) -> Bar {
        Bar {
            time: self.time.saturating_mul(1000),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Outcome of a history request that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryResponse {
    /// Bars in ascending time order (possibly empty).
    Bars(Vec<HistoricalBar>),
    /// Provider answered with an error payload (unknown pair, no data).
    Unavailable {
        /// Provider message.
        message: String,
    },
}

/// Market data error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketDataError {
    /// Connection error.
    #[error("Market data connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Data unavailable.
    #[error("Market data unavailable: {message}")]
    DataUnavailable {
        /// Error details.
        message: String,
    },

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// API error.
    #[error("Market data API error: {message}")]
    ApiError {
        /// Error details.
        message: String,
    },
}

/// Port for fetching market data from an external provider.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Fetch the full exchange/pair catalog.
    async fn get_exchange_catalog(&self) -> Result<ExchangeCatalog, MarketDataError>;

    /// Fetch daily bars ending at `request.to_ts`.
    async fn get_daily_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<HistoryResponse, MarketDataError>;

    /// Fetch the latest traded price of a pair.
    async fn get_price(&self, symbol: &ParsedSymbol) -> Result<f64, MarketDataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_insert_sorts_and_dedups_quotes() {
        let mut catalog = ExchangeCatalog::new();
        catalog.insert_pairs("Kraken", "BTC", vec!["USD".to_string(), "EUR".to_string()]);
        catalog.insert_pairs("Kraken", "BTC", vec!["USD".to_string()]);

        let pairs = catalog.pairs("Kraken").unwrap();
        assert_eq!(pairs["BTC"], vec!["EUR".to_string(), "USD".to_string()]);
        assert_eq!(catalog.exchange_count(), 1);
        assert!(catalog.pairs("Bitfinex").is_none());
    }

    #[test]
    fn historical_bar_to_chart_bar() {
        let bar = HistoricalBar {
            time: 1_700_000_000,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: Some(10.0),
        }
        .to_bar();

        assert_eq!(bar.time, 1_700_000_000_000);
        assert_eq!(bar.volume, Some(10.0));
    }

    #[test]
    fn garbage_timestamp_saturates() {
        let bar = HistoricalBar {
            time: i64::MAX / 10,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: None,
        };

        assert_eq!(bar.to_bar().time, i64::MAX);
        assert_eq!(
            HistoricalBar {
                time: i64::MIN / 10,
                ..bar
            }
            .to_bar()
            .time,
            i64::MIN
        );
    }

    #[test]
    fn register_exchange_without_pairs() {
        let mut catalog = ExchangeCatalog::new();
        catalog.insert_exchange("Kraken");
        catalog.insert_pairs("Kraken", "BTC", vec!["USD".to_string()]);
        catalog.insert_exchange("Kraken");

        assert_eq!(catalog.pairs("Kraken").unwrap().len(), 1);
        catalog.insert_exchange("Poloniex");
        assert!(catalog.pairs("Poloniex").unwrap().is_empty());
    }
}
