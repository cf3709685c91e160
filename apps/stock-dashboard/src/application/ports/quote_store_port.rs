//! Quote Store Ports (Driven Ports)
//!
//! The time-series store is append-only: one port appends single rows, the
//! other performs range-filtered reads keyed on insert time. Neither port
//! knows the store's query language.

use async_trait::async_trait;

use crate::domain::quote::{QuoteSnapshot, Symbol, SymbolFilter, TimeWindow};

/// Append failure. The snapshot of that tick is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// Store unreachable or connection lost.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A value cannot be stored (e.g. a non-finite price).
    #[error("invalid value for column `{field}`")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
    },

    /// Store rejected the row.
    #[error("store rejected row: {0}")]
    Rejected(String),
}

impl WriteError {
    /// Short machine-readable error kind for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::InvalidValue { .. } => "invalid_value",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Read failure, surfaced to the caller and never retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Store unreachable during a read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// Port for appending snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteWriterPort: Send + Sync {
    /// Append one snapshot as one row.
    ///
    /// Duplicates are accepted as distinct rows.
    async fn append(&self, snapshot: &QuoteSnapshot) -> Result<(), WriteError>;
}

/// Port for windowed reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteReaderPort: Send + Sync {
    /// All snapshots with `window.start <= insert_time <= window.end` that
    /// pass `filter`. Row order is unspecified.
    async fn select_window(
        &self,
        window: TimeWindow,
        filter: &SymbolFilter,
    ) -> Result<Vec<QuoteSnapshot>, QueryError>;

    /// Distinct symbols with at least one snapshot in the window.
    async fn distinct_symbols(&self, window: TimeWindow) -> Result<Vec<Symbol>, QueryError>;
}
