//! Port Definitions
//!
//! Driven ports used by the datafeed. Infrastructure provides the
//! implementations (CryptoCompare REST adapter, polling streamer).

mod market_data_port;
mod streaming_port;

pub use market_data_port::{
    ExchangeCatalog, HistoricalBar, HistoryRequest, HistoryResponse, MarketDataError,
    MarketDataPort,
};
pub use streaming_port::{RealtimeCallback, StreamingPort, SubscribeRequest};
