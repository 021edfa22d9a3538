//! Subscription registry.
//!
//! Groups subscribers by channel (`0~EXCHANGE~FROM~TO`) so each pair is
//! polled once no matter how many charts watch it. A subscriber id maps to
//! exactly one channel; a channel lives while it has at least one handler.

use std::collections::HashMap;

use crate::application::ports::{RealtimeCallback, SubscribeRequest};
use crate::domain::{Bar, ParsedSymbol};

/// A subscriber's callback.
#[derive(Clone)]
struct Handler {
    id: String,
    callback: RealtimeCallback,
}

/// Polling state for one pair.
struct Channel {
    symbol: ParsedSymbol,
    full_name: String,
    last_bar: Option<Bar>,
    handlers: Vec<Handler>,
}

/// A channel to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    /// Channel key.
    pub channel: String,
    /// Pair to fetch a price for.
    pub symbol: ParsedSymbol,
}

/// Result of folding a tick into a channel.
pub struct ChannelUpdate {
    /// Full symbol of the channel, used as the cache key.
    pub full_name: String,
    /// The updated bar.
    pub bar: Bar,
    /// Callbacks to deliver the bar to.
    pub callbacks: Vec<RealtimeCallback>,
}

/// Subscribers grouped by channel.
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, Channel>,
    subscriber_channels: HashMap<String, String>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `symbol`.
    ///
    /// A new channel starts from `request.last_bar`. An id that is already
    /// registered has its handler replaced, moving channels if needed.
    pub fn subscribe(&mut self, symbol: ParsedSymbol, request: &SubscribeRequest) {
        let key = symbol.channel();
        let uid = request.subscriber_uid.clone();

        if let Some(previous) = self.subscriber_channels.get(&uid)
            && previous != &key
        {
            let previous = previous.clone();
            self.remove_handler(&previous, &uid);
        }

        let channel = self.channels.entry(key.clone()).or_insert_with(|| Channel {
            full_name: request.symbol_info.full_name.clone(),
            symbol,
            last_bar: request.last_bar,
            handlers: Vec::new(),
        });

        let handler = Handler {
            id: uid.clone(),
            callback: request.on_tick.clone(),
        };
        match channel.handlers.iter_mut().find(|h| h.id == uid) {
            Some(existing) => *existing = handler,
            None => channel.handlers.push(handler),
        }

        self.subscriber_channels.insert(uid, key);
    }

    /// Remove a subscriber. Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, subscriber_uid: &str) -> bool {
        let Some(key) = self.subscriber_channels.remove(subscriber_uid) else {
            return false;
        };
        self.remove_handler(&key, subscriber_uid);
        true
    }

    fn remove_handler(&mut self, key: &str, subscriber_uid: &str) {
        let Some(channel) = self.channels.get_mut(key) else {
            return;
        };
        channel.handlers.retain(|h| h.id != subscriber_uid);
        if channel.handlers.is_empty() {
            self.channels.remove(key);
        }
    }

    /// Channels to poll.
    #[must_use]
    pub fn poll_targets(&self) -> Vec<PollTarget> {
        self.channels
            .iter()
            .map(|(key, channel)| PollTarget {
                channel: key.clone(),
                symbol: channel.symbol.clone(),
            })
            .collect()
    }

    /// Fold a price tick into a channel's last bar.
    ///
    /// Returns `None` if the channel was removed since it was polled.
    pub fn apply_tick(&mut self, key: &str, price: f64, tick_time_ms: i64) -> Option<ChannelUpdate> {
        let channel = self.channels.get_mut(key)?;
        let bar = Bar::apply_daily_tick(channel.last_bar.as_ref(), price, tick_time_ms);
        channel.last_bar = Some(bar);

        Some(ChannelUpdate {
            full_name: channel.full_name.clone(),
            bar,
            callbacks: channel.handlers.iter().map(|h| h.callback.clone()).collect(),
        })
    }

    /// Last bar of a channel.
    #[must_use]
    pub fn last_bar(&self, key: &str) -> Option<Bar> {
        self.channels.get(key).and_then(|c| c.last_bar)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_channels.len()
    }

    /// Number of active channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
