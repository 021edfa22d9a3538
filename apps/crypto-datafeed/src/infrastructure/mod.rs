//! Infrastructure Layer
//!
//! Adapters and external integrations:
//! - `cryptocompare`: REST adapter implementing `MarketDataPort`
//! - `streaming`: polling streamer implementing `StreamingPort`
//! - `config`: environment-based settings
//! - `telemetry`: tracing subscriber and optional OTLP export
//! - `metrics`: Prometheus metrics

pub mod config;
pub mod cryptocompare;
pub mod metrics;
pub mod streaming;
pub mod telemetry;
