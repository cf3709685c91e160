//! Shared fakes for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use stock_dashboard::{FetchError, Quote, QuoteProviderPort, QuoteSnapshot, Symbol};

/// Scripted quote provider.
///
/// Symbols can be marked as permanently failing, and individual calls can
/// be delayed to simulate a slow upstream.
#[derive(Default)]
pub struct FakeProvider {
    failing: HashSet<String>,
    delays: Mutex<HashMap<String, VecDeque<Duration>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch for `symbol` fails.
    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// The next fetches for `symbol` take the given durations, in order.
    pub fn delayed(self, symbol: &str, delays: &[Duration]) -> Self {
        self.delays
            .lock()
            .insert(symbol.to_string(), delays.iter().copied().collect());
        self
    }

    /// Number of fetches issued for `symbol`.
    pub fn calls(&self, symbol: &str) -> usize {
        self.calls.lock().get(symbol).copied().unwrap_or(0)
    }
}

#[async_trait]
impl QuoteProviderPort for FakeProvider {
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        let call = {
            let mut calls = self.calls.lock();
            let count = calls.entry(symbol.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let delay = self
            .delays
            .lock()
            .get_mut(symbol.as_str())
            .and_then(VecDeque::pop_front);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(symbol.as_str()) {
            return Err(FetchError::Provider {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let price = 100.0 + call as f64;
        Ok(Quote {
            symbol: symbol.clone(),
            current_price: price,
            high_price: price + 1.0,
            low_price: price - 1.0,
            open_price: 100.0,
            percent_change: price / 100.0 - 1.0,
            trade_time: Some(Utc::now()),
        })
    }
}

pub fn symbol(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn snapshot(s: &str, secs: i64, price: f64) -> QuoteSnapshot {
    QuoteSnapshot {
        symbol: symbol(s),
        current_price: price,
        high_price: price + 1.0,
        low_price: price - 1.0,
        open_price: price,
        percent_change: 0.1,
        trade_time: Some(at(secs - 2)),
        insert_time: at(secs),
    }
}
