//! Application Layer
//!
//! The datafeed contract and the ports it drives:
//! - `ports`: interfaces for the market data API and the realtime streamer
//! - `dto`: chart-facing request/response shapes (verbatim field names)
//! - `cache`: last-bar cache shared with the streamer
//! - `datafeed`: the six-operation datafeed

pub mod cache;
pub mod datafeed;
pub mod dto;
pub mod errors;
pub mod ports;

pub use cache::LastBarsCache;
pub use datafeed::{Datafeed, DEFAULT_HISTORY_LIMIT};
pub use errors::DatafeedError;
