//! Window Query Service
//!
//! Read path from the store to chart-shaped series. Selects snapshots whose
//! insert time falls in a closed window, optionally restricted to one
//! symbol, then groups them by symbol with each group in ascending insert
//! time order.
//!
//! Read-only: any number of queries may run concurrently with ingestion.

use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{QueryError, QuoteReaderPort};
use crate::domain::chart::{ChartData, group_by_symbol};
use crate::domain::quote::{QuoteSnapshot, Symbol, SymbolFilter, TimeWindow};
use crate::infrastructure::metrics;

/// Windowed, grouped, ordered access to stored snapshots.
#[derive(Clone)]
pub struct WindowQueryService {
    reader: Arc<dyn QuoteReaderPort>,
}

impl WindowQueryService {
    /// Create a query service over a store reader.
    #[must_use]
    pub fn new(reader: Arc<dyn QuoteReaderPort>) -> Self {
        Self { reader }
    }

    /// Snapshots with `window.start <= insert_time <= window.end` that pass
    /// `filter`.
    ///
    /// Results are grouped by symbol (groups in symbol order) and ascending
    /// by insert time within a group. An empty window or an unmatched filter
    /// yields an empty result, not an error. Neither touches the store.
    pub async fn query(
        &self,
        window: TimeWindow,
        filter: &SymbolFilter,
    ) -> Result<Vec<QuoteSnapshot>, QueryError> {
        let rows = self.select(window, filter).await?;
        Ok(group_by_symbol(rows).into_values().flatten().collect())
    }

    /// Per-symbol price and percent-change series for the window.
    pub async fn chart(
        &self,
        window: TimeWindow,
        filter: &SymbolFilter,
    ) -> Result<ChartData, QueryError> {
        let rows = self.select(window, filter).await?;
        let chart = ChartData::build(window, filter.clone(), rows);
        tracing::debug!(
            series = chart.series.len(),
            selection = ?filter.symbol(),
            "Chart built"
        );
        Ok(chart)
    }

    /// Distinct symbols with at least one snapshot in the window, sorted.
    pub async fn known_symbols(&self, window: TimeWindow) -> Result<Vec<Symbol>, QueryError> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let result = self.reader.distinct_symbols(window).await;
        metrics::record_query_duration(started.elapsed());

        let mut symbols = result.inspect_err(|e| {
            metrics::record_query_error();
            tracing::warn!(error = %e, "Symbol listing failed");
        })?;
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    async fn select(
        &self,
        window: TimeWindow,
        filter: &SymbolFilter,
    ) -> Result<Vec<QuoteSnapshot>, QueryError> {
        if window.is_empty() || filter.matches_nothing() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let result = self.reader.select_window(window, filter).await;
        metrics::record_query_duration(started.elapsed());

        let rows = result.inspect_err(|e| {
            metrics::record_query_error();
            tracing::warn!(error = %e, "Window query failed");
        })?;

        // Adapters are trusted for the window but not for the filter.
        Ok(rows
            .into_iter()
            .filter(|s| window.contains(s.insert_time) && filter.matches(&s.symbol))
            .collect())
    }
}
