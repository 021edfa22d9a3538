//! CryptoCompare adapter implementing MarketDataPort.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::application::ports::{
    ExchangeCatalog, HistoryRequest, HistoryResponse, MarketDataError, MarketDataPort,
};
use crate::domain::ParsedSymbol;
use crate::infrastructure::metrics;

use super::api_types::{self, ApiEnvelope, HistoryData};
use super::config::CryptoCompareConfig;
use super::error::CryptoCompareError;
use super::http_client::{CryptoCompareHttpClient, Endpoint};

/// CryptoCompare market data adapter.
#[derive(Debug, Clone)]
pub struct CryptoCompareAdapter {
    client: CryptoCompareHttpClient,
}

impl CryptoCompareAdapter {
    /// Create a new adapter.
    pub fn new(config: &CryptoCompareConfig) -> Result<Self, CryptoCompareError> {
        Ok(Self {
            client: CryptoCompareHttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl MarketDataPort for CryptoCompareAdapter {
    async fn get_exchange_catalog(&self) -> Result<ExchangeCatalog, MarketDataError> {
        let envelope: ApiEnvelope = self.client.get(Endpoint::Exchanges, &[]).await?;

        if envelope.is_error() {
            return Err(MarketDataError::ApiError {
                message: envelope.error_message(),
            });
        }

        let exchanges: HashMap<String, serde_json::Value> = envelope.into_data()?;
        let catalog = api_types::into_catalog(exchanges);

        tracing::debug!(
            exchanges = catalog.exchange_count(),
            "Fetched exchange catalog"
        );
        Ok(catalog)
    }

    async fn get_daily_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<HistoryResponse, MarketDataError> {
        let symbol = &request.symbol;
        let query = [
            ("e", symbol.exchange.clone()),
            ("fsym", symbol.from_symbol.clone()),
            ("tsym", symbol.to_symbol.clone()),
            ("toTs", request.to_ts.to_string()),
            ("limit", request.limit.to_string()),
        ];

        let envelope: ApiEnvelope = self.client.get(Endpoint::HistoDay, &query).await?;

        if envelope.is_error() {
            let message = envelope.error_message();
            tracing::debug!(%symbol, %message, "History unavailable");
            return Ok(HistoryResponse::Unavailable { message });
        }

        let data: HistoryData = envelope.into_data()?;
        let bars = data.into_bars();
        metrics::record_history_bars(bars.len() as u64);

        tracing::debug!(%symbol, to_ts = request.to_ts, bars = bars.len(), "Fetched daily history");
        Ok(HistoryResponse::Bars(bars))
    }

    async fn get_price(&self, symbol: &ParsedSymbol) -> Result<f64, MarketDataError> {
        let query = [
            ("fsym", symbol.from_symbol.clone()),
            ("tsyms", symbol.to_symbol.clone()),
            ("e", symbol.exchange.clone()),
        ];

        let payload: serde_json::Value = self.client.get(Endpoint::Price, &query).await?;

        api_types::price_from_payload(&payload, &symbol.to_symbol).map_err(|e| match e {
            CryptoCompareError::Api { message, .. } | CryptoCompareError::JsonParse(message) => {
                MarketDataError::DataUnavailable {
                    message: format!("{symbol}: {message}"),
                }
            }
            other => other.into(),
        })
    }
}
