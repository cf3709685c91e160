//! Finnhub Message Types
//!
//! Wire format of `GET /quote?symbol=...`:
//!
//! ```json
//! {"c":148.96,"d":-0.84,"dp":-0.5607,"h":149.7,"l":147.8,"o":148.985,"pc":149.8,"t":1700000000}
//! ```
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `c` | Current price |
//! | `h` | High price of the day |
//! | `l` | Low price of the day |
//! | `o` | Open price of the day |
//! | `dp` | Percent change versus previous close |
//! | `t` | Trade time, seconds since epoch |
//!
//! `d` (absolute change) and `pc` (previous close) are ignored.
//!
//! # References
//!
//! - [Quote](https://finnhub.io/docs/api/quote)

use chrono::DateTime;
use serde::Deserialize;

use crate::application::ports::FetchError;
use crate::domain::quote::{Quote, Symbol};

/// Raw quote body. Every field is optional on the wire; conversion decides
/// what is fatal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FinnhubQuote {
    /// Current price.
    #[serde(default)]
    pub c: Option<f64>,
    /// High price of the day.
    #[serde(default)]
    pub h: Option<f64>,
    /// Low price of the day.
    #[serde(default)]
    pub l: Option<f64>,
    /// Open price of the day.
    #[serde(default)]
    pub o: Option<f64>,
    /// Percent change.
    #[serde(default)]
    pub dp: Option<f64>,
    /// Trade time in epoch seconds.
    #[serde(default)]
    pub t: Option<i64>,
}

impl FinnhubQuote {
    /// Finnhub answers unknown symbols with zeros instead of an error.
    /// Both `c` and `t` must be present and zero.
    #[must_use]
    pub fn is_unknown_symbol(&self) -> bool {
        matches!((self.c, self.t), (Some(c), Some(0)) if c.abs() < f64::EPSILON)
    }

    /// Convert into a domain quote.
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnknownSymbol`] for the all-zero body
    /// - [`FetchError::MissingField`] if any field is absent or `null`
    /// - [`FetchError::Malformed`] if the trade time is out of range
    pub fn into_quote(self, symbol: &Symbol) -> Result<Quote, FetchError> {
        if self.is_unknown_symbol() {
            return Err(FetchError::UnknownSymbol(symbol.clone()));
        }

        let current_price = self.c.ok_or(FetchError::MissingField("c"))?;
        let high_price = self.h.ok_or(FetchError::MissingField("h"))?;
        let low_price = self.l.ok_or(FetchError::MissingField("l"))?;
        let open_price = self.o.ok_or(FetchError::MissingField("o"))?;
        let percent_change = self.dp.ok_or(FetchError::MissingField("dp"))?;
        let t = self.t.ok_or(FetchError::MissingField("t"))?;
        let trade_time = DateTime::from_timestamp(t, 0)
            .ok_or_else(|| FetchError::Malformed(format!("trade time {t} out of range")))?;

        Ok(Quote {
            symbol: symbol.clone(),
            current_price,
            high_price,
            low_price,
            open_price,
            percent_change,
            trade_time: Some(trade_time),
        })
    }
}
