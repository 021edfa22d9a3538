//! Symbol codec.
//!
//! Converts between the compact `EXCHANGE:FROM/TO` form used by the chart
//! and the exchange/pair parts the market data API expects.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between exchange and pair in a full symbol.
const EXCHANGE_SEPARATOR: char = ':';

/// Separator between base and quote asset.
const PAIR_SEPARATOR: char = '/';

/// Short and full string forms of a trading pair.
///
/// Examples:
/// - short: `"BTC/USD"`
/// - full: `"Bitfinex:BTC/USD"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolName {
    /// Pair without exchange (`FROM/TO`).
    pub short: String,
    /// Pair with exchange (`EXCHANGE:FROM/TO`).
    pub full: String,
}

/// Generate the short and full forms for a pair on an exchange.
#[must_use]
pub fn generate_symbol(exchange: &str, from_symbol: &str, to_symbol: &str) -> SymbolName {
    let short = format!("{from_symbol}{PAIR_SEPARATOR}{to_symbol}");
    let full = format!("{exchange}{EXCHANGE_SEPARATOR}{short}");
    SymbolName { short, full }
}

/// Exchange and pair parts of a full symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedSymbol {
    /// Exchange name (e.g., "Bitfinex").
    pub exchange: String,
    /// Base asset (e.g., "BTC").
    pub from_symbol: String,
    /// Quote asset (e.g., "USD").
    pub to_symbol: String,
}

impl ParsedSymbol {
    /// Streaming channel key, `0~EXCHANGE~FROM~TO`.
    #[must_use]
    pub fn channel(&self) -> String {
        format!("0~{}~{}~{}", self.exchange, self.from_symbol, self.to_symbol)
    }

    /// Re-encode as a [`SymbolName`].
    #[must_use]
    pub fn to_symbol_name(&self) -> SymbolName {
        generate_symbol(&self.exchange, &self.from_symbol, &self.to_symbol)
    }
}

impl fmt::Display for ParsedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{EXCHANGE_SEPARATOR}{}{PAIR_SEPARATOR}{}",
            self.exchange, self.from_symbol, self.to_symbol
        )
    }
}

/// Error returned for a full symbol that does not match `EXCHANGE:FROM/TO`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolParseError {
    /// No `:` between exchange and pair.
    #[error("missing exchange separator in symbol: {0}")]
    MissingExchange(String),

    /// No `/` between base and quote.
    #[error("missing pair separator in symbol: {0}")]
    MissingPair(String),

    /// One of the three parts is empty.
    #[error("empty component in symbol: {0}")]
    EmptyComponent(String),
}

/// Split a full symbol into exchange, base and quote.
///
/// Splits on the first `:` and then on the first `/` of the remainder.
/// Only delimiter presence and non-empty parts are checked.
pub fn parse_full_symbol(full: &str) -> Result<ParsedSymbol, SymbolParseError> {
    let (exchange, pair) = full
        .split_once(EXCHANGE_SEPARATOR)
        .ok_or_else(|| SymbolParseError::MissingExchange(full.to_string()))?;

    let (from_symbol, to_symbol) = pair
        .split_once(PAIR_SEPARATOR)
        .ok_or_else(|| SymbolParseError::MissingPair(full.to_string()))?;

    if exchange.is_empty() || from_symbol.is_empty() || to_symbol.is_empty() {
        return Err(SymbolParseError::EmptyComponent(full.to_string()));
    }

    Ok(ParsedSymbol {
        exchange: exchange.to_string(),
        from_symbol: from_symbol.to_string(),
        to_symbol: to_symbol.to_string(),
    })
}
