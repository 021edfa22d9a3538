//! Crypto Datafeed Binary
//!
//! Drives the datafeed the way a chart would: resolves a symbol, loads the
//! last month of daily bars, then streams live bar updates until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin crypto-datafeed -- Kraken:BTC/EUR
//! ```
//!
//! # Environment Variables
//!
//! - `CRYPTOCOMPARE_BASE_URL`: API base URL (default: <https://min-api.cryptocompare.com>)
//! - `CRYPTOCOMPARE_API_KEY`: Optional API key
//! - `DATAFEED_HTTP_TIMEOUT_SECS`: HTTP timeout (default: 30)
//! - `DATAFEED_HISTORY_LIMIT`: Bars per history request (default: 2000)
//! - `DATAFEED_POLL_INTERVAL_MS`: Realtime poll interval (default: 10000)
//! - `DATAFEED_MAX_ATTEMPTS`: HTTP attempts per request (default: 1)
//! - `DATAFEED_METRICS_PORT`: Prometheus exporter port (default: 0, disabled)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use crypto_datafeed::domain::DAY_MS;
use crypto_datafeed::infrastructure::{metrics, telemetry};
use crypto_datafeed::{
    Bar, CryptoCompareAdapter, Datafeed, DatafeedSettings, LastBarsCache, PeriodParams,
    PollingStreamer, Resolution,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Symbol streamed when none is given on the command line.
const DEFAULT_SYMBOL: &str = "Bitfinex:BTC/USD";

/// Days of history loaded before streaming.
const HISTORY_DAYS: i64 = 30;

/// Subscriber id used by this process.
const SUBSCRIBER_UID: &str = "cli";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init()?;

    let settings = DatafeedSettings::from_env()?;
    log_config(&settings);

    metrics::init_metrics(settings.metrics_addr())?;

    let symbol_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    let market_data = Arc::new(
        CryptoCompareAdapter::new(&settings.cryptocompare)
            .context("failed to build CryptoCompare client")?,
    );
    let last_bars = Arc::new(LastBarsCache::new());
    let streamer = Arc::new(
        PollingStreamer::new(Arc::clone(&market_data), Arc::clone(&last_bars))
            .with_poll_interval(settings.streaming.poll_interval),
    );
    let datafeed = Datafeed::new(market_data, Arc::clone(&streamer), last_bars)
        .with_history_limit(settings.history_limit);

    let configuration = datafeed.on_ready().await;
    tracing::info!(
        configuration = %serde_json::to_string(&configuration)?,
        "Datafeed ready"
    );

    let symbol_info = datafeed
        .resolve_symbol(&symbol_name)
        .await
        .with_context(|| format!("failed to resolve {symbol_name}"))?;
    tracing::info!(
        symbol = %symbol_info.full_name,
        exchange = %symbol_info.exchange,
        name = %symbol_info.name,
        "Symbol resolved"
    );

    let now_secs = chrono::Utc::now().timestamp();
    let period = PeriodParams {
        from: now_secs - HISTORY_DAYS * DAY_MS / 1000,
        to: now_secs,
        count_back: None,
        first_data_request: true,
    };
    let history = datafeed
        .get_bars(&symbol_info, Resolution::Day, &period)
        .await
        .with_context(|| format!("failed to load history for {symbol_name}"))?;

    if history.meta.no_data {
        tracing::warn!(symbol = %symbol_info.full_name, "No history available");
    } else {
        for bar in &history.bars {
            log_bar("History bar", bar);
        }
    }

    let shutdown_token = CancellationToken::new();
    let poller = streamer.start(shutdown_token.clone());

    datafeed.subscribe_bars(
        &symbol_info,
        Resolution::Day,
        SUBSCRIBER_UID,
        Arc::new(|bar: &Bar| log_bar("Realtime bar", bar)),
    );

    tracing::info!("Streaming updates, press Ctrl-C to stop");
    signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    datafeed.unsubscribe_bars(SUBSCRIBER_UID);
    shutdown_token.cancel();
    poller.await.context("streaming poller panicked")?;

    if let Some(handle) = metrics::metrics_handle() {
        tracing::debug!(metrics = %handle.render(), "Final metrics");
    }

    Ok(())
}

fn log_bar(message: &'static str, bar: &Bar) {
    let time = chrono::DateTime::from_timestamp_millis(bar.time)
        .map_or_else(|| bar.time.to_string(), |t| t.to_rfc3339());
    tracing::info!(
        %time,
        open = bar.open,
        high = bar.high,
        low = bar.low,
        close = bar.close,
        volume = ?bar.volume,
        "{message}"
    );
}

/// Log the parsed configuration.
fn log_config(settings: &DatafeedSettings) {
    tracing::info!(
        base_url = %settings.cryptocompare.base_url,
        api_key_set = settings.cryptocompare.api_key.is_some(),
        history_limit = settings.history_limit,
        poll_interval_ms = settings.streaming.poll_interval.as_millis(),
        max_attempts = settings.cryptocompare.retry.max_attempts,
        metrics_port = settings.metrics_port,
        "Configuration loaded"
    );
}

fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
