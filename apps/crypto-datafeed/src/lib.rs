#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Crypto Datafeed - Charting Widget Data Source
//!
//! Implements the datafeed contract a financial charting widget calls to
//! get its configuration, search and resolve symbols, load historical
//! bars and receive realtime bar updates, backed by the CryptoCompare
//! public REST API.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Symbols and bars
//!   - `symbol`: `EXCHANGE:FROM/TO` naming and parsing
//!   - `bar`: OHLC bars, resolutions and the daily tick rule
//!
//! - **Application**: The datafeed and its ports
//!   - `datafeed`: The six chart-facing operations
//!   - `cache`: Last history bar per symbol
//!   - `ports`: Market data and streaming interfaces
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `cryptocompare`: REST client for catalog, history and prices
//!   - `streaming`: Polling realtime streamer
//!   - `config`: Environment configuration
//!   - `telemetry` / `metrics`: Tracing and Prometheus metrics
//!
//! # Data Flow
//!
//! ```text
//! Chart ──► Datafeed ──► CryptoCompareAdapter ──► min-api.cryptocompare.com
//!   ▲          │                  ▲
//!   │          ▼                  │ data/price
//!   └──── PollingStreamer ────────┘
//!         (LastBarsCache seeds each channel)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Symbols and bars with no external dependencies.
pub mod domain;

/// Application layer - Datafeed operations and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{
    Bar, ParsedSymbol, Resolution, SymbolName, SymbolParseError, generate_symbol,
    parse_full_symbol,
};

// Application
pub use application::dto::{
    DatafeedConfiguration, HistoryMetadata, HistoryResult, LibrarySymbolInfo, PeriodParams,
    SearchSymbolResult,
};
pub use application::{Datafeed, DatafeedError, LastBarsCache};

// Infrastructure
pub use infrastructure::config::{ConfigError, DatafeedSettings};
pub use infrastructure::cryptocompare::{CryptoCompareAdapter, CryptoCompareConfig};
pub use infrastructure::streaming::PollingStreamer;
