//! CryptoCompare Market Data Adapter
//!
//! Implementation of `MarketDataPort` for the CryptoCompare public REST API:
//! - Exchange/pair catalog (`data/v3/all/exchanges`)
//! - Daily history (`data/histoday`)
//! - Latest price (`data/price`), used by the polling streamer

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::CryptoCompareAdapter;
pub use config::{CryptoCompareConfig, DEFAULT_BASE_URL, RetryConfig};
pub use error::CryptoCompareError;
