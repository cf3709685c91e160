//! Quote Domain Types
//!
//! The unit of ingested and queried data: a [`Quote`] as returned by the
//! provider, and a [`QuoteSnapshot`] once the writer side has stamped it
//! with an insert time.
//!
//! # Design
//!
//! A fetched quote has no insert time. Stamping it produces a separate type,
//! so a record without an ordering key can never reach the store.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Symbol
// =============================================================================

/// Opaque ticker identifier (e.g. `AAPL`, `BINANCE:BTCUSDT`).
///
/// Case-sensitive and never validated against an exchange list. Two
/// snapshots with the same string belong to the same series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::Empty`] if the value is empty or only whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, SymbolError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(SymbolError::Empty);
        }
        Ok(Self(value))
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = SymbolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Invalid symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// Symbol string was empty.
    #[error("symbol cannot be empty")]
    Empty,
}

// =============================================================================
// Quote
// =============================================================================

/// One observation of a symbol as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Quoted symbol.
    pub symbol: Symbol,
    /// Current (last) price.
    pub current_price: f64,
    /// High price of the day.
    pub high_price: f64,
    /// Low price of the day.
    pub low_price: f64,
    /// Open price of the day.
    pub open_price: f64,
    /// Percent change versus previous close. May be negative.
    pub percent_change: f64,
    /// When the quoted price was observed upstream.
    pub trade_time: Option<DateTime<Utc>>,
}

// =============================================================================
// Quote Snapshot
// =============================================================================

/// A quote stamped with the time it was appended to the store.
///
/// `insert_time` is the ordering and partitioning key for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Quoted symbol.
    pub symbol: Symbol,
    /// Current (last) price.
    pub current_price: f64,
    /// High price of the day.
    pub high_price: f64,
    /// Low price of the day.
    pub low_price: f64,
    /// Open price of the day.
    pub open_price: f64,
    /// Percent change versus previous close.
    pub percent_change: f64,
    /// Provider trade time, absent in stores without the column.
    pub trade_time: Option<DateTime<Utc>>,
    /// Writer-assigned insert time.
    pub insert_time: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Stamp a fetched quote with its insert time.
    #[must_use]
    pub fn stamp(quote: Quote, insert_time: DateTime<Utc>) -> Self {
        Self {
            symbol: quote.symbol,
            current_price: quote.current_price,
            high_price: quote.high_price,
            low_price: quote.low_price,
            open_price: quote.open_price,
            percent_change: quote.percent_change,
            trade_time: quote.trade_time,
            insert_time,
        }
    }

    /// Name of the first numeric field that is not a finite number.
    #[must_use]
    pub fn first_non_finite_field(&self) -> Option<&'static str> {
        [
            ("current_price", self.current_price),
            ("high_price", self.high_price),
            ("low_price", self.low_price),
            ("open_price", self.open_price),
            ("percent_change", self.percent_change),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
    }
}

// =============================================================================
// Time Window
// =============================================================================

/// Closed time interval `[start, end]` bounding a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window from explicit bounds.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The trailing window `[now - duration, now]`.
    ///
    /// The start saturates at the earliest representable time.
    #[must_use]
    pub fn trailing(now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start: now
                .checked_sub_signed(duration)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now,
        }
    }

    /// Whether `time` falls within the window, bounds included.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }

    /// An inverted window (`start > end`) matches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

// =============================================================================
// Symbol Filter
// =============================================================================

/// Optional restriction of a query to one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum SymbolFilter {
    /// Every symbol.
    #[default]
    All,
    /// Exactly this symbol.
    Only(Symbol),
    /// A selector that can never name a stored symbol, e.g. whitespace.
    Unmatched(String),
}

impl SymbolFilter {
    /// Build a filter from an optional selector value.
    ///
    /// Absent or empty values select all symbols. Any other value restricts
    /// to exactly that string, so a value no symbol can take matches nothing.
    #[must_use]
    pub fn from_optional(value: Option<&str>) -> Self {
        match value {
            None | Some("") => Self::All,
            Some(raw) => {
                Symbol::new(raw).map_or_else(|_| Self::Unmatched(raw.to_string()), Self::Only)
            }
        }
    }

    /// Whether a snapshot with this symbol passes the filter.
    #[must_use]
    pub fn matches(&self, symbol: &Symbol) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => only == symbol,
            Self::Unmatched(_) => false,
        }
    }

    /// Whether no snapshot can pass the filter.
    #[must_use]
    pub const fn matches_nothing(&self) -> bool {
        matches!(self, Self::Unmatched(_))
    }

    /// The selected symbol, if any.
    #[must_use]
    pub const fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::All | Self::Unmatched(_) => None,
            Self::Only(symbol) => Some(symbol),
        }
    }
}

impl From<Option<String>> for SymbolFilter {
    fn from(value: Option<String>) -> Self {
        Self::from_optional(value.as_deref())
    }
}

impl From<SymbolFilter> for Option<String> {
    fn from(filter: SymbolFilter) -> Self {
        match filter {
            SymbolFilter::All => None,
            SymbolFilter::Only(symbol) => Some(symbol.into()),
            SymbolFilter::Unmatched(raw) => Some(raw),
        }
    }
}
