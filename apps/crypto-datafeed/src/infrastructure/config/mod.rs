//! Configuration Module
//!
//! Environment-based configuration for the datafeed binary.

mod settings;

pub use settings::{ConfigError, DatafeedSettings, StreamingSettings};
