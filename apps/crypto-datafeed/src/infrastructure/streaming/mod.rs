//! Realtime Streaming
//!
//! Polling implementation of `StreamingPort`. Subscribers are grouped by
//! channel (`0~EXCHANGE~FROM~TO`) and each channel's price is polled on a
//! fixed interval.

mod poller;
mod registry;

pub use poller::{DEFAULT_POLL_INTERVAL, PollingStreamer};
pub use registry::{ChannelUpdate, PollTarget, SubscriptionRegistry};
