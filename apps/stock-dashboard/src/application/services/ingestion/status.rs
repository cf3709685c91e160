//! Ingestion status tracking.
//!
//! One [`SymbolStatus`] per scheduled symbol, updated by its ticks and read
//! by the health endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::quote::Symbol;

/// Position of one symbol in the `Idle → Waiting → Fetching → Writing` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionPhase {
    /// Scheduler not started.
    Idle,
    /// Waiting for the next tick.
    Waiting,
    /// Provider call in progress.
    Fetching,
    /// Store append in progress.
    Writing,
}

/// Live counters for one symbol.
#[derive(Debug)]
pub struct SymbolStatus {
    interval: Duration,
    phase: RwLock<IngestionPhase>,
    written: AtomicU64,
    fetch_failures: AtomicU64,
    write_failures: AtomicU64,
    skipped: AtomicU64,
    last_success: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl SymbolStatus {
    /// Create status for a symbol ticking every `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            phase: RwLock::new(IngestionPhase::Idle),
            written: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            last_success: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Tick interval of this symbol.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Move to a new phase.
    pub fn set_phase(&self, phase: IngestionPhase) {
        *self.phase.write() = phase;
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> IngestionPhase {
        *self.phase.read()
    }

    /// Record a successful append.
    pub fn record_written(&self, insert_time: DateTime<Utc>) {
        self.written.fetch_add(1, Ordering::Relaxed);
        *self.last_success.write() = Some(insert_time);
    }

    /// Record a failed fetch.
    pub fn record_fetch_failure(&self, message: String) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.write() = Some(message);
    }

    /// Record a failed append.
    pub fn record_write_failure(&self, message: String) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.write() = Some(message);
    }

    /// Record a tick dropped by skip-if-busy.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshots written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Failed fetches so far.
    #[must_use]
    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    /// Failed appends so far.
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Ticks skipped so far.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Most recent error message.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn report(&self, symbol: &Symbol) -> SymbolIngestionReport {
        SymbolIngestionReport {
            symbol: symbol.clone(),
            phase: self.phase(),
            interval_secs: self.interval.as_secs(),
            snapshots_written: self.written(),
            fetch_failures: self.fetch_failures(),
            write_failures: self.write_failures(),
            ticks_skipped: self.skipped(),
            last_success: *self.last_success.read(),
            last_error: self.last_error(),
        }
    }
}

/// Serializable view of one symbol's status.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolIngestionReport {
    /// Symbol.
    pub symbol: Symbol,
    /// Current phase.
    pub phase: IngestionPhase,
    /// Tick interval in seconds.
    pub interval_secs: u64,
    /// Snapshots appended.
    pub snapshots_written: u64,
    /// Failed fetches.
    pub fetch_failures: u64,
    /// Failed appends.
    pub write_failures: u64,
    /// Ticks dropped by skip-if-busy.
    pub ticks_skipped: u64,
    /// Insert time of the last appended snapshot.
    pub last_success: Option<DateTime<Utc>>,
    /// Most recent error.
    pub last_error: Option<String>,
}

/// Status of every scheduled symbol. The symbol set is fixed at construction.
#[derive(Debug, Default)]
pub struct IngestionStatus {
    symbols: BTreeMap<Symbol, Arc<SymbolStatus>>,
}

impl IngestionStatus {
    pub(super) fn insert(&mut self, symbol: Symbol, status: Arc<SymbolStatus>) {
        self.symbols.insert(symbol, status);
    }

    /// Status of one symbol.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Arc<SymbolStatus>> {
        self.symbols.get(symbol)
    }

    /// Reports for all symbols, sorted by symbol.
    #[must_use]
    pub fn reports(&self) -> Vec<SymbolIngestionReport> {
        self.symbols
            .iter()
            .map(|(symbol, status)| status.report(symbol))
            .collect()
    }

    /// Whether any symbol has appended at least one snapshot.
    #[must_use]
    pub fn has_written_any(&self) -> bool {
        self.symbols.values().any(|s| s.written() > 0)
    }

    /// Number of scheduled symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbols are scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
