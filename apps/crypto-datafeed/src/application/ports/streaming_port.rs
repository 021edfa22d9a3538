//! Streaming Port (Driven Port)
//!
//! Interface for realtime bar subscriptions. The datafeed forwards the
//! chart's subscribe/unsubscribe calls here unchanged, adding the cached
//! last bar as the starting point of the stream.

use std::fmt;
use std::sync::Arc;

use crate::application::dto::LibrarySymbolInfo;
use crate::domain::{Bar, Resolution};

/// Callback invoked with each updated bar.
pub type RealtimeCallback = Arc<dyn Fn(&Bar) + Send + Sync>;

/// A realtime subscription request.
#[derive(Clone)]
pub struct SubscribeRequest {
    /// Subscriber identifier chosen by the chart.
    pub subscriber_uid: String,
    /// Symbol being streamed.
    pub symbol_info: LibrarySymbolInfo,
    /// Chart resolution of the subscription.
    pub resolution: Resolution,
    /// Receives every updated bar.
    pub on_tick: RealtimeCallback,
    /// Most recent bar known from history, if any.
    pub last_bar: Option<Bar>,
}

impl fmt::Debug for SubscribeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeRequest")
            .field("subscriber_uid", &self.subscriber_uid)
            .field("symbol", &self.symbol_info.full_name)
            .field("resolution", &self.resolution)
            .field("last_bar", &self.last_bar)
            .finish_non_exhaustive()
    }
}

/// Port for realtime bar subscriptions.
pub trait StreamingPort: Send + Sync {
    /// Register a subscriber.
    fn subscribe(&self, request: SubscribeRequest);

    /// Remove a subscriber. Unknown identifiers are ignored.
    fn unsubscribe(&self, subscriber_uid: &str);
}
