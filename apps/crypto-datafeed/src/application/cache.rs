//! Last-bar cache.
//!
//! Remembers the most recent history bar per full symbol so a realtime
//! subscription can continue from it. One entry per symbol ever requested;
//! entries are overwritten, never evicted.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::Bar;

/// Most recent bar per full symbol (`EXCHANGE:FROM/TO`).
#[derive(Debug, Default)]
pub struct LastBarsCache {
    bars: RwLock<HashMap<String, Bar>>,
}

impl LastBarsCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last bar for a symbol.
    #[must_use]
    pub fn get(&self, full_name: &str) -> Option<Bar> {
        self.bars.read().get(full_name).copied()
    }

    /// Store the last bar for a symbol. Last writer wins.
    pub fn insert(&self, full_name: impl Into<String>, bar: Bar) {
        self.bars.write().insert(full_name.into(), bar);
    }

    /// Number of cached symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_by_symbol() {
        let cache = LastBarsCache::new();
        assert!(cache.is_empty());

        cache.insert("Bitfinex:BTC/USD", Bar::flat(1, 10.0));
        cache.insert("Bitfinex:BTC/USD", Bar::flat(2, 11.0));
        cache.insert("Kraken:ETH/EUR", Bar::flat(1, 5.0));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("Bitfinex:BTC/USD"), Some(Bar::flat(2, 11.0)));
        assert!(cache.get("Kraken:BTC/USD").is_none());
    }
}
