//! Polling streamer implementing StreamingPort.
//!
//! Every poll interval the latest price of each subscribed pair is fetched
//! and folded into the channel's daily bar. The updated bar is written back
//! to the channel and the shared `LastBarsCache`, then pushed to every
//! handler on the channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::LastBarsCache;
use crate::application::ports::{MarketDataPort, StreamingPort, SubscribeRequest};
use crate::domain::parse_full_symbol;
use crate::infrastructure::metrics;

use super::registry::SubscriptionRegistry;

/// Default delay between price polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Realtime bar source that polls the market data provider.
pub struct PollingStreamer<M> {
    market_data: Arc<M>,
    last_bars: Arc<LastBarsCache>,
    registry: RwLock<SubscriptionRegistry>,
    poll_interval: Duration,
}

impl<M> std::fmt::Debug for PollingStreamer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("PollingStreamer")
            .field("subscribers", &registry.subscriber_count())
            .field("channels", &registry.channel_count())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<M: MarketDataPort + 'static> PollingStreamer<M> {
    /// Create a streamer sharing `last_bars` with the datafeed.
    #[must_use]
    pub fn new(market_data: Arc<M>, last_bars: Arc<LastBarsCache>) -> Self {
        Self {
            market_data,
            last_bars,
            registry: RwLock::new(SubscriptionRegistry::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the delay between polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.read().subscriber_count()
    }

    /// Number of channels being polled.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.registry.read().channel_count()
    }

    /// Spawn the polling loop. It runs until `shutdown` is cancelled.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let streamer = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(streamer.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::info!(
                poll_interval_ms = streamer.poll_interval.as_millis(),
                "Streaming poller started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        streamer.poll_once().await;
                    }
                    () = shutdown.cancelled() => {
                        tracing::info!("Streaming poller shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Poll every channel once at the current time.
    ///
    /// Returns the number of handler deliveries.
    pub async fn poll_once(&self) -> usize {
        self.poll_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// Poll every channel once, timestamping ticks with `tick_time_ms`.
    ///
    /// A failed price fetch is logged and skips only that channel.
    pub async fn poll_at(&self, tick_time_ms: i64) -> usize {
        let targets = self.registry.read().poll_targets();
        let mut delivered = 0;

        for target in targets {
            let price = match self.market_data.get_price(&target.symbol).await {
                Ok(price) => price,
                Err(e) => {
                    metrics::record_poll_error();
                    tracing::warn!(
                        channel = %target.channel,
                        error = %e,
                        "Price poll failed"
                    );
                    continue;
                }
            };

            let Some(update) = self
                .registry
                .write()
                .apply_tick(&target.channel, price, tick_time_ms)
            else {
                continue;
            };

            self.last_bars.insert(update.full_name.clone(), update.bar);

            tracing::debug!(
                channel = %target.channel,
                time = update.bar.time,
                close = update.bar.close,
                handlers = update.callbacks.len(),
                "[socket] Update bar"
            );

            for callback in &update.callbacks {
                callback(&update.bar);
            }
            delivered += update.callbacks.len();
        }

        metrics::record_stream_updates(delivered as u64);
        delivered
    }

    fn record_counts(&self) {
        let registry = self.registry.read();
        metrics::set_subscriptions(registry.subscriber_count(), registry.channel_count());
    }
}

impl<M: MarketDataPort + 'static> StreamingPort for PollingStreamer<M> {
    fn subscribe(&self, request: SubscribeRequest) {
        let symbol = match parse_full_symbol(&request.symbol_info.full_name) {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::warn!(
                    subscriber_uid = %request.subscriber_uid,
                    error = %e,
                    "Cannot subscribe to malformed symbol"
                );
                return;
            }
        };

        tracing::info!(
            subscriber_uid = %request.subscriber_uid,
            channel = %symbol.channel(),
            resolution = %request.resolution,
            "[subscribeBars]: Subscribe to streaming"
        );

        self.registry.write().subscribe(symbol, &request);
        self.record_counts();
    }

    fn unsubscribe(&self, subscriber_uid: &str) {
        if self.registry.write().unsubscribe(subscriber_uid) {
            tracing::info!(subscriber_uid, "[unsubscribeBars]: Unsubscribe from streaming");
            self.record_counts();
        } else {
            tracing::debug!(subscriber_uid, "Unsubscribe for unknown subscriber");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::application::dto::{LibrarySymbolInfo, SearchSymbolResult};
    use crate::application::ports::{
        ExchangeCatalog, HistoryRequest, HistoryResponse, MarketDataError, RealtimeCallback,
    };
    use crate::domain::{Bar, DAY_MS, ParsedSymbol, Resolution};

    /// Serves scripted prices per channel; missing entries fail.
    #[derive(Default)]
    struct ScriptedPrices {
        prices: Mutex<Vec<(String, f64)>>,
        calls: AtomicUsize,
    }

    impl ScriptedPrices {
        fn set(&self, channel: &str, price: f64) {
            let mut prices = self.prices.lock();
            prices.retain(|(c, _)| c != channel);
            prices.push((channel.to_string(), price));
        }
    }

    #[async_trait]
    impl MarketDataPort for ScriptedPrices {
        async fn get_exchange_catalog(&self) -> Result<ExchangeCatalog, MarketDataError> {
            Ok(ExchangeCatalog::new())
        }

        async fn get_daily_history(
            &self,
            _request: &HistoryRequest,
        ) -> Result<HistoryResponse, MarketDataError> {
            Ok(HistoryResponse::Bars(Vec::new()))
        }

        async fn get_price(&self, symbol: &ParsedSymbol) -> Result<f64, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let channel = symbol.channel();
            self.prices
                .lock()
                .iter()
                .find(|(c, _)| *c == channel)
                .map(|(_, p)| *p)
                .ok_or(MarketDataError::DataUnavailable { message: channel })
        }
    }

    fn request(
        uid: &str,
        full_name: &str,
        last_bar: Option<Bar>,
        sink: &Arc<Mutex<Vec<Bar>>>,
    ) -> SubscribeRequest {
        let sink = Arc::clone(sink);
        let on_tick: RealtimeCallback = Arc::new(move |bar: &Bar| sink.lock().push(*bar));
        let (exchange, short) = full_name.split_once(':').unwrap();
        let item = SearchSymbolResult {
            symbol: short.to_string(),
            full_name: full_name.to_string(),
            description: String::new(),
            exchange: exchange.to_string(),
            symbol_type: "crypto".to_string(),
        };
        SubscribeRequest {
            subscriber_uid: uid.to_string(),
            symbol_info: LibrarySymbolInfo::from_search_result(&item, Resolution::all()),
            resolution: Resolution::Day,
            on_tick,
            last_bar,
        }
    }

    fn streamer(
        prices: &Arc<ScriptedPrices>,
    ) -> (Arc<PollingStreamer<ScriptedPrices>>, Arc<LastBarsCache>) {
        let cache = Arc::new(LastBarsCache::new());
        let streamer = Arc::new(PollingStreamer::new(Arc::clone(prices), Arc::clone(&cache)));
        (streamer, cache)
    }

    #[tokio::test]
    async fn tick_updates_seeded_bar_and_cache() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Bitfinex~BTC~USD", 105.0);
        let (streamer, cache) = streamer(&prices);
        let sink = Arc::new(Mutex::new(Vec::new()));

        let seed = Bar {
            time: 20 * DAY_MS,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: Some(5.0),
        };
        streamer.subscribe(request("a", "Bitfinex:BTC/USD", Some(seed), &sink));

        let delivered = streamer.poll_at(20 * DAY_MS + 60_000).await;

        assert_eq!(delivered, 1);
        let bars = sink.lock().clone();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].time, 20 * DAY_MS);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 105.0);
        assert_eq!(bars[0].low, 99.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(cache.get("Bitfinex:BTC/USD"), Some(bars[0]));
    }

    #[tokio::test]
    async fn tick_past_day_starts_new_bar() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Bitfinex~BTC~USD", 90.0);
        let (streamer, _cache) = streamer(&prices);
        let sink = Arc::new(Mutex::new(Vec::new()));

        streamer.subscribe(request(
            "a",
            "Bitfinex:BTC/USD",
            Some(Bar::flat(20 * DAY_MS, 100.0)),
            &sink,
        ));
        streamer.poll_at(21 * DAY_MS + 5).await;

        assert_eq!(sink.lock()[0], Bar::flat(21 * DAY_MS, 90.0));
    }

    #[tokio::test]
    async fn unseeded_channel_opens_at_day_boundary() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Kraken~ETH~EUR", 2_000.0);
        let (streamer, _cache) = streamer(&prices);
        let sink = Arc::new(Mutex::new(Vec::new()));

        streamer.subscribe(request("a", "Kraken:ETH/EUR", None, &sink));
        streamer.poll_at(5 * DAY_MS + 3_600_000).await;

        assert_eq!(sink.lock()[0], Bar::flat(5 * DAY_MS, 2_000.0));
    }

    #[tokio::test]
    async fn fan_out_to_every_handler() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Bitfinex~BTC~USD", 1.0);
        let (streamer, _cache) = streamer(&prices);
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        streamer.subscribe(request("a", "Bitfinex:BTC/USD", None, &first));
        streamer.subscribe(request("b", "Bitfinex:BTC/USD", None, &second));

        assert_eq!(streamer.poll_at(0).await, 2);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.lock().len(), 1);
        assert_eq!(second.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_channel_does_not_stop_others() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Kraken~BTC~USD", 50.0);
        let (streamer, cache) = streamer(&prices);
        let failing = Arc::new(Mutex::new(Vec::new()));
        let working = Arc::new(Mutex::new(Vec::new()));

        streamer.subscribe(request("a", "Bitfinex:BTC/USD", None, &failing));
        streamer.subscribe(request("b", "Kraken:BTC/USD", None, &working));

        assert_eq!(streamer.poll_at(0).await, 1);
        assert!(failing.lock().is_empty());
        assert_eq!(working.lock().len(), 1);
        assert!(cache.get("Bitfinex:BTC/USD").is_none());
    }

    #[tokio::test]
    async fn unsubscribe_last_handler_stops_polling() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Bitfinex~BTC~USD", 1.0);
        let (streamer, _cache) = streamer(&prices);
        let sink = Arc::new(Mutex::new(Vec::new()));

        streamer.subscribe(request("a", "Bitfinex:BTC/USD", None, &sink));
        streamer.unsubscribe("a");
        streamer.unsubscribe("unknown");

        assert_eq!(streamer.channel_count(), 0);
        assert_eq!(streamer.poll_at(0).await, 0);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_symbol_is_ignored() {
        let prices = Arc::new(ScriptedPrices::default());
        let (streamer, _cache) = streamer(&prices);
        let sink = Arc::new(Mutex::new(Vec::new()));

        let mut req = request("a", "Bitfinex:BTC/USD", None, &sink);
        req.symbol_info.full_name = "BTCUSD".to_string();
        streamer.subscribe(req);

        assert_eq!(streamer.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn poller_stops_on_cancel() {
        let prices = Arc::new(ScriptedPrices::default());
        prices.set("0~Bitfinex~BTC~USD", 1.0);
        let cache = Arc::new(LastBarsCache::new());
        let streamer = Arc::new(
            PollingStreamer::new(Arc::clone(&prices), cache)
                .with_poll_interval(Duration::from_millis(50)),
        );
        let sink = Arc::new(Mutex::new(Vec::new()));
        streamer.subscribe(request("a", "Bitfinex:BTC/USD", None, &sink));

        let shutdown = CancellationToken::new();
        let handle = streamer.start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(!sink.lock().is_empty());
    }
}
