//! Chart Shaping
//!
//! Groups window query results by symbol, orders each group by insert time,
//! and projects two parallel series per group: price and percent change.
//! Both series of a group share the same ordering, so index `i` in one
//! refers to the same snapshot as index `i` in the other.
//!
//! Projections are pure: no smoothing, resampling or interpolation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::quote::{QuoteSnapshot, Symbol, SymbolFilter, TimeWindow};

/// Colours assigned to series by index, cycled when exhausted.
pub const SERIES_PALETTE: [&str; 6] = [
    "#1e88e5", "#7cb342", "#fbc02d", "#ab47bc", "#26a69a", "#5d8aa8",
];

/// One `(time, value)` point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Snapshot insert time.
    pub time: DateTime<Utc>,
    /// Projected value.
    pub value: f64,
}

/// The two chart series of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSeries {
    /// Series symbol.
    pub symbol: Symbol,
    /// Display colour.
    pub color: &'static str,
    /// `(insert_time, current_price)` ascending by time.
    pub price: Vec<SeriesPoint>,
    /// `(insert_time, percent_change)` in the same order as `price`.
    pub percent_change: Vec<SeriesPoint>,
}

impl SymbolSeries {
    /// Project already ordered snapshots of one symbol.
    #[must_use]
    pub fn project(symbol: Symbol, color: &'static str, snapshots: &[QuoteSnapshot]) -> Self {
        let price = snapshots
            .iter()
            .map(|s| SeriesPoint {
                time: s.insert_time,
                value: s.current_price,
            })
            .collect();
        let percent_change = snapshots
            .iter()
            .map(|s| SeriesPoint {
                time: s.insert_time,
                value: s.percent_change,
            })
            .collect();

        Self {
            symbol,
            color,
            price,
            percent_change,
        }
    }

    /// Number of points in each series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.price.len()
    }

    /// Whether the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
    }
}

/// Chart payload for one window and selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Queried window.
    pub window: TimeWindow,
    /// Symbol filter the data was queried with.
    pub selection: SymbolFilter,
    /// One entry per symbol. Order carries no meaning.
    pub series: Vec<SymbolSeries>,
}

impl ChartData {
    /// Build chart data from unordered query results.
    #[must_use]
    pub fn build(
        window: TimeWindow,
        selection: SymbolFilter,
        snapshots: Vec<QuoteSnapshot>,
    ) -> Self {
        let series = group_by_symbol(snapshots)
            .into_iter()
            .enumerate()
            .map(|(index, (symbol, rows))| {
                let color = SERIES_PALETTE[index % SERIES_PALETTE.len()];
                SymbolSeries::project(symbol, color, &rows)
            })
            .collect();

        Self {
            window,
            selection,
            series,
        }
    }

    /// Look up the series of a symbol.
    #[must_use]
    pub fn series_for(&self, symbol: &str) -> Option<&SymbolSeries> {
        self.series.iter().find(|s| s.symbol.as_str() == symbol)
    }

    /// Whether no symbol has data in the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Group snapshots by symbol and sort each group ascending by insert time.
///
/// The sort is stable: snapshots sharing an insert time (duplicate appends)
/// keep the order the store returned them in.
#[must_use]
pub fn group_by_symbol(snapshots: Vec<QuoteSnapshot>) -> BTreeMap<Symbol, Vec<QuoteSnapshot>> {
    let mut groups: BTreeMap<Symbol, Vec<QuoteSnapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        groups
            .entry(snapshot.symbol.clone())
            .or_default()
            .push(snapshot);
    }
    for rows in groups.values_mut() {
        rows.sort_by_key(|s| s.insert_time);
    }
    groups
}
