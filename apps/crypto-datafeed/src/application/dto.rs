//! Chart-facing data transfer objects.
//!
//! Field names serialize exactly as the charting widget expects them.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Resolution};

/// Symbol type advertised for every pair.
pub const CRYPTO_SYMBOL_TYPE: &str = "crypto";

/// An exchange entry in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDescriptor {
    /// Value passed back as the `exchange` search argument.
    pub value: String,
    /// Filter name.
    pub name: String,
    /// Full name shown in the filter popup.
    pub desc: String,
}

impl ExchangeDescriptor {
    fn new(value: &str, desc: &str) -> Self {
        Self {
            value: value.to_string(),
            name: value.to_string(),
            desc: desc.to_string(),
        }
    }
}

/// A symbol type entry in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTypeDescriptor {
    /// Display name.
    pub name: String,
    /// Value passed back as the `symbolType` search argument.
    pub value: String,
}

/// Static datafeed configuration returned by `on_ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatafeedConfiguration {
    /// Resolutions the chart may request.
    pub supported_resolutions: Vec<Resolution>,
    /// Exchanges offered for filtering; also the exchanges expanded into
    /// the symbol catalog.
    pub exchanges: Vec<ExchangeDescriptor>,
    /// Symbol types offered for filtering.
    pub symbols_types: Vec<SymbolTypeDescriptor>,
}

impl Default for DatafeedConfiguration {
    fn default() -> Self {
        Self {
            supported_resolutions: Resolution::all().to_vec(),
            exchanges: vec![
                ExchangeDescriptor::new("Bitfinex", "Bitfinex"),
                ExchangeDescriptor::new("Kraken", "Kraken bitcoin exchange"),
            ],
            symbols_types: vec![SymbolTypeDescriptor {
                name: CRYPTO_SYMBOL_TYPE.to_string(),
                value: CRYPTO_SYMBOL_TYPE.to_string(),
            }],
        }
    }
}

/// One symbol search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSymbolResult {
    /// Short name (`BTC/USD`).
    pub symbol: String,
    /// Full name (`Bitfinex:BTC/USD`).
    pub full_name: String,
    /// Description shown in search results.
    pub description: String,
    /// Exchange name.
    pub exchange: String,
    /// Symbol type.
    #[serde(rename = "type")]
    pub symbol_type: String,
}

/// Resolved symbol descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySymbolInfo {
    /// Unique identifier; the full symbol.
    pub ticker: String,
    /// Full symbol (`EXCHANGE:FROM/TO`).
    pub full_name: String,
    /// Short symbol (`FROM/TO`).
    pub name: String,
    /// Description.
    pub description: String,
    /// Symbol type.
    #[serde(rename = "type")]
    pub symbol_type: String,
    /// Trading session.
    pub session: String,
    /// Exchange timezone.
    pub timezone: String,
    /// Exchange name.
    pub exchange: String,
    /// Minimal price movement numerator.
    pub minmov: u32,
    /// Price scale (100 = two decimals).
    pub pricescale: u32,
    /// Whether intraday resolutions are available.
    pub has_intraday: bool,
    /// Whether volume is unavailable.
    pub has_no_volume: bool,
    /// Whether weekly and monthly bars come from the datafeed.
    pub has_weekly_and_monthly: bool,
    /// Resolutions available for this symbol.
    pub supported_resolutions: Vec<Resolution>,
    /// Volume decimal places.
    pub volume_precision: u32,
    /// Data status shown on the chart.
    pub data_status: String,
}

impl LibrarySymbolInfo {
    /// Build the descriptor for a catalog entry with the fixed crypto metadata.
    #[must_use]
    pub fn from_search_result(
        item: &SearchSymbolResult,
        supported_resolutions: &[Resolution],
    ) -> Self {
        Self {
            ticker: item.full_name.clone(),
            full_name: item.full_name.clone(),
            name: item.symbol.clone(),
            description: item.description.clone(),
            symbol_type: item.symbol_type.clone(),
            session: "24x7".to_string(),
            timezone: "Etc/UTC".to_string(),
            exchange: item.exchange.clone(),
            minmov: 1,
            pricescale: 100,
            has_intraday: false,
            has_no_volume: true,
            has_weekly_and_monthly: false,
            supported_resolutions: supported_resolutions.to_vec(),
            volume_precision: 2,
            data_status: "streaming".to_string(),
        }
    }
}

/// History request window.
///
/// `from` is inclusive and `to` exclusive, both Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodParams {
    /// Window start (inclusive, Unix seconds).
    pub from: i64,
    /// Window end (exclusive, Unix seconds).
    pub to: i64,
    /// Exact number of bars wanted, when the chart knows it.
    #[serde(default)]
    pub count_back: Option<u32>,
    /// Whether this is the first request for the symbol.
    #[serde(default)]
    pub first_data_request: bool,
}

/// Metadata accompanying a history response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMetadata {
    /// No data exists for the requested window.
    pub no_data: bool,
    /// Time of the next available bar, when known (ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_time: Option<i64>,
}

/// Bars for a history request plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResult {
    /// Bars in ascending time order.
    pub bars: Vec<Bar>,
    /// Response metadata.
    pub meta: HistoryMetadata,
}

impl HistoryResult {
    /// A response signalling no data in the window.
    #[must_use]
    pub const fn no_data() -> Self {
        Self {
            bars: Vec::new(),
            meta: HistoryMetadata {
                no_data: true,
                next_time: None,
            },
        }
    }

    /// A response carrying bars.
    #[must_use]
    pub fn with_bars(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            meta: HistoryMetadata {
                no_data: false,
                next_time: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_configuration_matches_chart_contract() {
        let json = serde_json::to_value(DatafeedConfiguration::default()).unwrap();
        assert_eq!(
            json,
            json!({
                "supported_resolutions": ["1D", "1W", "1M"],
                "exchanges": [
                    {"value": "Bitfinex", "name": "Bitfinex", "desc": "Bitfinex"},
                    {"value": "Kraken", "name": "Kraken", "desc": "Kraken bitcoin exchange"}
                ],
                "symbols_types": [{"name": "crypto", "value": "crypto"}]
            })
        );
    }

    #[test]
    fn symbol_info_fixed_metadata() {
        let item = SearchSymbolResult {
            symbol: "BTC/USD".to_string(),
            full_name: "Bitfinex:BTC/USD".to_string(),
            description: "BTC/USD".to_string(),
            exchange: "Bitfinex".to_string(),
            symbol_type: CRYPTO_SYMBOL_TYPE.to_string(),
        };
        let info = LibrarySymbolInfo::from_search_result(&item, Resolution::all());
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["ticker"], "Bitfinex:BTC/USD");
        assert_eq!(json["name"], "BTC/USD");
        assert_eq!(json["type"], "crypto");
        assert_eq!(json["session"], "24x7");
        assert_eq!(json["timezone"], "Etc/UTC");
        assert_eq!(json["pricescale"], 100);
        assert_eq!(json["has_no_volume"], true);
        assert_eq!(json["volume_precision"], 2);
        assert_eq!(json["data_status"], "streaming");
    }

    #[test]
    fn period_params_use_chart_field_names() {
        let params: PeriodParams = serde_json::from_value(json!({
            "from": 100,
            "to": 200,
            "countBack": 5,
            "firstDataRequest": true
        }))
        .unwrap();

        assert_eq!(params.from, 100);
        assert_eq!(params.count_back, Some(5));
        assert!(params.first_data_request);
    }

    #[test]
    fn history_metadata_field_names() {
        let json = serde_json::to_value(HistoryResult::no_data().meta).unwrap();
        assert_eq!(json, json!({"noData": true}));
    }
}
