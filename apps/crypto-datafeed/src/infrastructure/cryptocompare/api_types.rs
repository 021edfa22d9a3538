//! CryptoCompare API response types.

use std::collections::HashMap;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};

use super::error::CryptoCompareError;
use crate::application::ports::{ExchangeCatalog, HistoricalBar};

/// Common response wrapper: `{"Response": ..., "Message": ..., "Data": ...}`.
///
/// Errors are reported with HTTP 200 and `"Response": "Error"`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
    #[serde(rename = "Data", default)]
    pub data: serde_json::Value,
}

impl ApiEnvelope {
    pub fn is_error(&self) -> bool {
        self.response.as_deref() == Some("Error")
    }

    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string())
    }

    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, CryptoCompareError> {
        serde_json::from_value(self.data).map_err(|e| CryptoCompareError::JsonParse(e.to_string()))
    }
}

// =============================================================================
// Exchange catalog (data/v3/all/exchanges)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ExchangeEntry {
    #[serde(default, deserialize_with = "lenient_pairs")]
    pub pairs: HashMap<String, PairQuotes>,
}

/// Anything other than a map of pairs (`[]`, `null`) counts as no pairs.
fn lenient_pairs<'de, D>(deserializer: D) -> Result<HashMap<String, PairQuotes>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Quote assets listed for one base asset.
///
/// Older payloads use a plain list; current ones nest the quotes under
/// `tsyms` keyed by symbol.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PairQuotes {
    List(Vec<String>),
    Tsyms {
        #[serde(default)]
        tsyms: HashMap<String, serde_json::Value>,
    },
    Unrecognized(IgnoredAny),
}

impl PairQuotes {
    pub fn into_symbols(self) -> Vec<String> {
        match self {
            Self::List(symbols) => symbols,
            Self::Tsyms { tsyms } => tsyms.into_keys().collect(),
            Self::Unrecognized(_) => Vec::new(),
        }
    }
}

/// Build the catalog from the raw `Data` map.
///
/// Entries are decoded one exchange at a time. A malformed exchange is kept
/// with no pairs so it cannot spoil the rest of the catalog.
pub fn into_catalog(exchanges: HashMap<String, serde_json::Value>) -> ExchangeCatalog {
    let mut catalog = ExchangeCatalog::new();
    for (exchange, raw) in exchanges {
        let entry = serde_json::from_value::<ExchangeEntry>(raw).unwrap_or_else(|e| {
            tracing::debug!(%exchange, error = %e, "Malformed catalog entry, no pairs listed");
            ExchangeEntry::default()
        });

        catalog.insert_exchange(exchange.clone());
        for (from_symbol, quotes) in entry.pairs {
            catalog.insert_pairs(exchange.clone(), from_symbol, quotes.into_symbols());
        }
    }
    catalog
}

// =============================================================================
// Daily history (data/histoday)
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApiBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volumefrom: Option<f64>,
}

impl From<ApiBar> for HistoricalBar {
    fn from(bar: ApiBar) -> Self {
        Self {
            time: bar.time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volumefrom,
        }
    }
}

/// `Data` of a history response: a bare list (v1) or wrapped with the
/// aggregation window (v2).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HistoryData {
    Bars(Vec<ApiBar>),
    Wrapped {
        #[serde(rename = "Data", default)]
        data: Vec<ApiBar>,
    },
}

impl HistoryData {
    pub fn into_bars(self) -> Vec<HistoricalBar> {
        let bars = match self {
            Self::Bars(bars) | Self::Wrapped { data: bars } => bars,
        };
        bars.into_iter().map(HistoricalBar::from).collect()
    }
}

// =============================================================================
// Latest price (data/price)
// =============================================================================

/// Extract `to_symbol`'s price from a `{"USD": 43000.1}` payload.
pub fn price_from_payload(
    payload: &serde_json::Value,
    to_symbol: &str,
) -> Result<f64, CryptoCompareError> {
    if payload.get("Response").and_then(serde_json::Value::as_str) == Some("Error") {
        let message = payload
            .get("Message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        return Err(CryptoCompareError::Api {
            code: "Error".to_string(),
            message: message.to_string(),
        });
    }

    payload
        .get(to_symbol)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| CryptoCompareError::JsonParse(format!("missing price for {to_symbol}")))
}
