//! Domain Layer
//!
//! Core types for the datafeed with no external I/O:
//! - `symbol`: full/short symbol codec (`EXCHANGE:FROM/TO`)
//! - `bar`: OHLCV bars, resolutions and the daily bar folding rule

pub mod bar;
pub mod symbol;

pub use bar::{Bar, DAY_MS, Resolution, ResolutionParseError};
pub use symbol::{ParsedSymbol, SymbolName, SymbolParseError, generate_symbol, parse_full_symbol};
