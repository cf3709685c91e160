//! In-memory quote store for testing.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{QueryError, QuoteReaderPort, QuoteWriterPort, WriteError};
use crate::domain::quote::{QuoteSnapshot, Symbol, SymbolFilter, TimeWindow};

/// In-memory implementation of both store ports.
///
/// Append-only like the real store: duplicates become separate rows and
/// rows are returned in append order. Suitable for testing and development.
/// Not for production use.
#[derive(Debug, Default)]
pub struct InMemoryQuoteStore {
    rows: RwLock<Vec<QuoteSnapshot>>,
}

impl InMemoryQuoteStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Rows stored for one symbol, in append order.
    #[must_use]
    pub fn rows_for(&self, symbol: &str) -> Vec<QuoteSnapshot> {
        self.rows
            .read()
            .iter()
            .filter(|s| s.symbol.as_str() == symbol)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QuoteWriterPort for InMemoryQuoteStore {
    async fn append(&self, snapshot: &QuoteSnapshot) -> Result<(), WriteError> {
        if let Some(field) = snapshot.first_non_finite_field() {
            return Err(WriteError::InvalidValue { field });
        }
        self.rows.write().push(snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl QuoteReaderPort for InMemoryQuoteStore {
    async fn select_window(
        &self,
        window: TimeWindow,
        filter: &SymbolFilter,
    ) -> Result<Vec<QuoteSnapshot>, QueryError> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|s| window.contains(s.insert_time) && filter.matches(&s.symbol))
            .cloned()
            .collect())
    }

    async fn distinct_symbols(&self, window: TimeWindow) -> Result<Vec<Symbol>, QueryError> {
        let mut symbols: Vec<Symbol> = self
            .rows
            .read()
            .iter()
            .filter(|s| window.contains(s.insert_time))
            .map(|s| s.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}
