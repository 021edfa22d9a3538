//! Datafeed
//!
//! The six operations the charting widget calls on its data source:
//! configuration, symbol search, symbol resolution, history, and realtime
//! subscribe/unsubscribe. Request/response operations are `async fn`s
//! returning `Result`; realtime updates are pushed through a callback.

use std::sync::Arc;

use crate::application::cache::LastBarsCache;
use crate::application::dto::{
    CRYPTO_SYMBOL_TYPE, DatafeedConfiguration, HistoryResult, LibrarySymbolInfo, PeriodParams,
    SearchSymbolResult,
};
use crate::application::errors::DatafeedError;
use crate::application::ports::{
    HistoryRequest, HistoryResponse, MarketDataPort, RealtimeCallback, StreamingPort,
    SubscribeRequest,
};
use crate::domain::{Bar, Resolution, generate_symbol, parse_full_symbol};

/// Maximum bars requested per history call.
pub const DEFAULT_HISTORY_LIMIT: u32 = 2000;

/// Chart datafeed backed by a market data provider and a realtime streamer.
pub struct Datafeed<M, S> {
    market_data: Arc<M>,
    streaming: Arc<S>,
    last_bars: Arc<LastBarsCache>,
    configuration: DatafeedConfiguration,
    history_limit: u32,
}

impl<M, S> std::fmt::Debug for Datafeed<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datafeed")
            .field("exchanges", &self.configuration.exchanges.len())
            .field("cached_bars", &self.last_bars.len())
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl<M, S> Datafeed<M, S>
where
    M: MarketDataPort,
    S: StreamingPort,
{
    /// Create a datafeed with the default configuration.
    ///
    /// `last_bars` is shared with the streamer so both see the same
    /// continuation bars.
    #[must_use]
    pub fn new(market_data: Arc<M>, streaming: Arc<S>, last_bars: Arc<LastBarsCache>) -> Self {
        Self {
            market_data,
            streaming,
            last_bars,
            configuration: DatafeedConfiguration::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Replace the advertised configuration.
    #[must_use]
    pub fn with_configuration(mut self, configuration: DatafeedConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Set the maximum bars requested per history call.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    /// The last-bar cache shared with the streamer.
    #[must_use]
    pub const fn last_bars(&self) -> &Arc<LastBarsCache> {
        &self.last_bars
    }

    /// Return the static configuration.
    ///
    /// Yields to the runtime once first so callers always observe an
    /// asynchronous completion.
    pub async fn on_ready(&self) -> DatafeedConfiguration {
        tracing::debug!("[onReady]: Method call");
        tokio::task::yield_now().await;
        self.configuration.clone()
    }

    /// Search the catalog.
    ///
    /// Keeps entries whose full name contains `user_input` (ignoring case)
    /// and whose exchange and type equal the given filters. An empty filter
    /// matches everything.
    pub async fn search_symbols(
        &self,
        user_input: &str,
        exchange: &str,
        symbol_type: &str,
    ) -> Result<Vec<SearchSymbolResult>, DatafeedError> {
        tracing::debug!(user_input, exchange, symbol_type, "[searchSymbols]: Method call");

        let needle = user_input.to_lowercase();
        let symbols = self.all_symbols().await?;
        let matches: Vec<_> = symbols
            .into_iter()
            .filter(|s| exchange.is_empty() || s.exchange == exchange)
            .filter(|s| symbol_type.is_empty() || s.symbol_type == symbol_type)
            .filter(|s| s.full_name.to_lowercase().contains(&needle))
            .collect();

        tracing::debug!(count = matches.len(), "[searchSymbols]: Search complete");
        Ok(matches)
    }

    /// Resolve a full symbol name to its descriptor.
    pub async fn resolve_symbol(&self, symbol_name: &str) -> Result<LibrarySymbolInfo, DatafeedError> {
        tracing::debug!(symbol = symbol_name, "[resolveSymbol]: Method call");

        let symbols = self.all_symbols().await?;
        let Some(item) = symbols.iter().find(|s| s.full_name == symbol_name) else {
            tracing::info!(symbol = symbol_name, "[resolveSymbol]: Cannot resolve symbol");
            return Err(DatafeedError::SymbolNotFound {
                symbol: symbol_name.to_string(),
            });
        };

        let info =
            LibrarySymbolInfo::from_search_result(item, &self.configuration.supported_resolutions);
        tracing::debug!(symbol = symbol_name, "[resolveSymbol]: Symbol resolved");
        Ok(info)
    }

    /// Fetch history bars for `[period.from, period.to)`.
    ///
    /// Returns `no_data` when the provider reports an error or has no bars.
    /// On the first request for a symbol, the last returned bar is cached as
    /// the starting point for realtime updates.
    pub async fn get_bars(
        &self,
        symbol_info: &LibrarySymbolInfo,
        resolution: Resolution,
        period: &PeriodParams,
    ) -> Result<HistoryResult, DatafeedError> {
        tracing::debug!(
            symbol = %symbol_info.full_name,
            %resolution,
            from = period.from,
            to = period.to,
            first_data_request = period.first_data_request,
            "[getBars]: Method call"
        );

        let symbol = parse_full_symbol(&symbol_info.full_name)?;
        let request = HistoryRequest {
            symbol,
            to_ts: period.to,
            limit: self.history_limit,
        };

        let response = self
            .market_data
            .get_daily_history(&request)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "[getBars]: Get error"))?;

        let raw = match response {
            HistoryResponse::Bars(bars) if !bars.is_empty() => bars,
            HistoryResponse::Bars(_) => return Ok(HistoryResult::no_data()),
            HistoryResponse::Unavailable { message } => {
                tracing::debug!(%message, "[getBars]: Provider reported no data");
                return Ok(HistoryResult::no_data());
            }
        };

        let bars: Vec<Bar> = raw
            .iter()
            .filter(|bar| bar.time >= period.from && bar.time < period.to)
            .map(|bar| bar.to_bar())
            .collect();

        if period.first_data_request
            && let Some(last) = bars.last()
        {
            self.last_bars.insert(symbol_info.full_name.clone(), *last);
        }

        tracing::debug!(count = bars.len(), "[getBars]: returned bar(s)");
        Ok(HistoryResult::with_bars(bars))
    }

    /// Start realtime updates for a subscriber.
    pub fn subscribe_bars(
        &self,
        symbol_info: &LibrarySymbolInfo,
        resolution: Resolution,
        subscriber_uid: impl Into<String>,
        on_tick: RealtimeCallback,
    ) {
        let subscriber_uid = subscriber_uid.into();
        tracing::debug!(%subscriber_uid, "[subscribeBars]: Method call");

        self.streaming.subscribe(SubscribeRequest {
            subscriber_uid,
            symbol_info: symbol_info.clone(),
            resolution,
            on_tick,
            last_bar: self.last_bars.get(&symbol_info.full_name),
        });
    }

    /// Stop realtime updates for a subscriber.
    pub fn unsubscribe_bars(&self, subscriber_uid: &str) {
        tracing::debug!(subscriber_uid, "[unsubscribeBars]: Method call");
        self.streaming.unsubscribe(subscriber_uid);
    }

    /// Expand the configured exchanges of the catalog into search entries.
    async fn all_symbols(&self) -> Result<Vec<SearchSymbolResult>, DatafeedError> {
        let catalog = self.market_data.get_exchange_catalog().await?;
        let mut symbols = Vec::new();

        for exchange in &self.configuration.exchanges {
            let Some(pairs) = catalog.pairs(&exchange.value) else {
                tracing::warn!(exchange = %exchange.value, "Exchange missing from catalog");
                continue;
            };

            for (from_symbol, to_symbols) in pairs {
                for to_symbol in to_symbols {
                    let name = generate_symbol(&exchange.value, from_symbol, to_symbol);
                    symbols.push(SearchSymbolResult {
                        description: name.short.clone(),
                        symbol: name.short,
                        full_name: name.full,
                        exchange: exchange.value.clone(),
                        symbol_type: CRYPTO_SYMBOL_TYPE.to_string(),
                    });
                }
            }
        }

        Ok(symbols)
    }
}
