//! Ingestion Scheduler
//!
//! Owns one independent periodic timer per configured symbol. Each tick
//! fetches a quote and appends it to the store, cycling through
//! `Waiting → Fetching → Writing → Waiting`.
//!
//! # Isolation
//!
//! - Every symbol runs its own timer task; a slow or failing symbol never
//!   delays another.
//! - Errors are contained in the tick that produced them: they are logged,
//!   counted, and the snapshot is dropped.
//! - Ticks run in their own tasks so the timer keeps firing while a tick is
//!   in flight. A tick that fires while the previous one for the same symbol
//!   is still running is skipped (skip-if-busy).
//!
//! # Shutdown
//!
//! Cancelling the token stops all timers. In-flight ticks get
//! `shutdown_grace` to finish; anything still running afterwards is
//! abandoned, which is safe because every append is a single row.

mod guard;
mod status;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use guard::{InFlightGuard, InFlightPermit};
pub use status::{IngestionPhase, IngestionStatus, SymbolIngestionReport, SymbolStatus};

use crate::application::ports::{FetchError, QuoteProviderPort, QuoteWriterPort};
use crate::domain::quote::{QuoteSnapshot, Symbol};
use crate::infrastructure::metrics::{self, TickOutcome};

// =============================================================================
// Configuration
// =============================================================================

/// Schedule entry for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSchedule {
    /// Symbol to ingest.
    pub symbol: Symbol,
    /// Interval override; `None` uses the shared frequency.
    pub interval: Option<Duration>,
}

impl SymbolSchedule {
    /// Schedule a symbol at the shared frequency.
    #[must_use]
    pub const fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            interval: None,
        }
    }

    /// Schedule a symbol at its own interval.
    #[must_use]
    pub const fn with_interval(symbol: Symbol, interval: Duration) -> Self {
        Self {
            symbol,
            interval: Some(interval),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Shared tick interval.
    pub frequency: Duration,
    /// Upper bound on one provider call.
    pub fetch_timeout: Duration,
    /// Time in-flight ticks get to finish after cancellation.
    pub shutdown_grace: Duration,
    /// Symbols to ingest.
    pub symbols: Vec<SymbolSchedule>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(30),
            symbols: Vec::new(),
        }
    }
}

// =============================================================================
// Tick Worker
// =============================================================================

/// Fetch-then-append for one tick. Shared by all symbol tasks.
struct TickWorker {
    provider: Arc<dyn QuoteProviderPort>,
    writer: Arc<dyn QuoteWriterPort>,
    fetch_timeout: Duration,
}

impl TickWorker {
    async fn run_tick(
        &self,
        symbol: &Symbol,
        status: &SymbolStatus,
        fired_at: DateTime<Utc>,
    ) -> TickOutcome {
        metrics::adjust_in_flight(1.0);
        status.set_phase(IngestionPhase::Fetching);

        let started = Instant::now();
        let fetched = tokio::time::timeout(self.fetch_timeout, self.provider.fetch(symbol))
            .await
            .unwrap_or(Err(FetchError::Timeout(self.fetch_timeout)));
        metrics::record_fetch_duration(symbol.as_str(), started.elapsed());

        let outcome = match fetched {
            Ok(quote) => {
                status.set_phase(IngestionPhase::Writing);
                let snapshot = QuoteSnapshot::stamp(quote, fired_at);

                let started = Instant::now();
                let written = self.writer.append(&snapshot).await;
                metrics::record_write_duration(started.elapsed());

                match written {
                    Ok(()) => {
                        tracing::debug!(
                            symbol = %symbol,
                            price = snapshot.current_price,
                            percent_change = snapshot.percent_change,
                            "Snapshot appended"
                        );
                        status.record_written(snapshot.insert_time);
                        TickOutcome::Written
                    }
                    Err(e) => {
                        tracing::warn!(
                            symbol = %symbol,
                            error = %e,
                            kind = e.kind(),
                            "Snapshot append failed, dropping tick"
                        );
                        status.record_write_failure(e.to_string());
                        TickOutcome::WriteFailed
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    symbol = %symbol,
                    error = %e,
                    kind = e.kind(),
                    "Quote fetch failed"
                );
                status.record_fetch_failure(e.to_string());
                TickOutcome::FetchFailed
            }
        };

        status.set_phase(IngestionPhase::Waiting);
        metrics::adjust_in_flight(-1.0);
        metrics::record_tick(symbol.as_str(), outcome);
        outcome
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Per-symbol scheduling state.
#[derive(Clone)]
struct SymbolSlot {
    symbol: Symbol,
    interval: Duration,
    status: Arc<SymbolStatus>,
    guard: InFlightGuard,
}

/// Periodic fetch-and-append scheduler, one timer per symbol.
pub struct IngestionScheduler {
    worker: Arc<TickWorker>,
    slots: BTreeMap<Symbol, SymbolSlot>,
    status: Arc<IngestionStatus>,
    shutdown_grace: Duration,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl IngestionScheduler {
    /// Create a scheduler. Duplicate symbols are collapsed onto the first
    /// schedule entry.
    #[must_use]
    pub fn new(
        provider: Arc<dyn QuoteProviderPort>,
        writer: Arc<dyn QuoteWriterPort>,
        config: IngestionConfig,
        cancel: CancellationToken,
    ) -> Self {
        let mut slots = BTreeMap::new();
        let mut status = IngestionStatus::default();

        for schedule in config.symbols {
            if slots.contains_key(&schedule.symbol) {
                tracing::warn!(symbol = %schedule.symbol, "Duplicate symbol in schedule, ignoring");
                continue;
            }
            let interval = schedule.interval.unwrap_or(config.frequency);
            let symbol_status = Arc::new(SymbolStatus::new(interval));
            status.insert(schedule.symbol.clone(), Arc::clone(&symbol_status));
            slots.insert(
                schedule.symbol.clone(),
                SymbolSlot {
                    symbol: schedule.symbol,
                    interval,
                    status: symbol_status,
                    guard: InFlightGuard::new(),
                },
            );
        }

        Self {
            worker: Arc::new(TickWorker {
                provider,
                writer,
                fetch_timeout: config.fetch_timeout,
            }),
            slots,
            status: Arc::new(status),
            shutdown_grace: config.shutdown_grace,
            cancel,
            tracker: TaskTracker::new(),
        }
    }

    /// Shared ingestion status, readable while the scheduler runs.
    #[must_use]
    pub fn status(&self) -> Arc<IngestionStatus> {
        Arc::clone(&self.status)
    }

    /// Scheduled symbols in sorted order.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.slots.keys().cloned().collect()
    }

    /// Run one tick for `symbol` immediately, honouring skip-if-busy.
    ///
    /// Returns `None` if the symbol is not scheduled.
    pub async fn tick_now(&self, symbol: &str) -> Option<TickOutcome> {
        let slot = self.slots.get(symbol)?;
        let Some(_permit) = slot.guard.try_begin() else {
            slot.status.record_skipped();
            metrics::record_tick(symbol, TickOutcome::Skipped);
            return Some(TickOutcome::Skipped);
        };
        Some(
            self.worker
                .run_tick(&slot.symbol, &slot.status, Utc::now())
                .await,
        )
    }

    /// Run all symbol timers until the cancellation token fires, then drain
    /// in-flight ticks.
    pub async fn run(self) {
        tracing::info!(symbols = self.slots.len(), "Ingestion scheduler started");

        let mut timers = JoinSet::new();
        for slot in self.slots.values() {
            slot.status.set_phase(IngestionPhase::Waiting);
            timers.spawn(run_symbol_timer(
                Arc::clone(&self.worker),
                slot.clone(),
                self.tracker.clone(),
                self.cancel.clone(),
            ));
        }

        self.cancel.cancelled().await;
        while timers.join_next().await.is_some() {}

        self.tracker.close();
        if tokio::time::timeout(self.shutdown_grace, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                in_flight = self.tracker.len(),
                "Abandoning in-flight ticks after shutdown grace period"
            );
        }

        tracing::info!("Ingestion scheduler stopped");
    }
}

/// Timer loop of one symbol. Spawns each tick so the timer never waits on it.
async fn run_symbol_timer(
    worker: Arc<TickWorker>,
    slot: SymbolSlot,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    tracing::debug!(
        symbol = %slot.symbol,
        interval_secs = slot.interval.as_secs_f64(),
        "Symbol timer started"
    );

    let mut interval = tokio::time::interval(slot.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(symbol = %slot.symbol, "Symbol timer cancelled");
                break;
            }
            _ = interval.tick() => {
                let Some(permit) = slot.guard.try_begin() else {
                    tracing::debug!(symbol = %slot.symbol, "Previous tick still in flight, skipping");
                    slot.status.record_skipped();
                    metrics::record_tick(slot.symbol.as_str(), TickOutcome::Skipped);
                    continue;
                };

                let fired_at = Utc::now();
                let worker = Arc::clone(&worker);
                let slot = slot.clone();
                tracker.spawn(async move {
                    let _permit = permit;
                    worker.run_tick(&slot.symbol, &slot.status, fired_at).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockQuoteProviderPort, MockQuoteWriterPort, WriteError};
    use crate::domain::quote::Quote;
    use async_trait::async_trait;

    fn symbol(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    fn quote_for(symbol: &Symbol) -> Quote {
        Quote {
            symbol: symbol.clone(),
            current_price: 148.96,
            high_price: 149.7,
            low_price: 147.8,
            open_price: 148.985,
            percent_change: -0.56,
            trade_time: None,
        }
    }

    fn config(symbols: &[&str]) -> IngestionConfig {
        IngestionConfig {
            symbols: symbols
                .iter()
                .map(|s| SymbolSchedule::new(symbol(s)))
                .collect(),
            ..IngestionConfig::default()
        }
    }

    fn scheduler(
        provider: MockQuoteProviderPort,
        writer: MockQuoteWriterPort,
        symbols: &[&str],
    ) -> IngestionScheduler {
        IngestionScheduler::new(
            Arc::new(provider),
            Arc::new(writer),
            config(symbols),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn successful_tick_appends_stamped_snapshot() {
        let mut provider = MockQuoteProviderPort::new();
        provider
            .expect_fetch()
            .times(1)
            .returning(|s| Ok(quote_for(s)));

        let mut writer = MockQuoteWriterPort::new();
        writer
            .expect_append()
            .withf(|s| s.symbol.as_str() == "AAPL" && s.insert_time <= Utc::now())
            .times(1)
            .returning(|_| Ok(()));

        let scheduler = scheduler(provider, writer, &["AAPL"]);
        let outcome = scheduler.tick_now("AAPL").await;

        assert_eq!(outcome, Some(TickOutcome::Written));
        let status = scheduler.status();
        let aapl = status.get("AAPL").unwrap();
        assert_eq!(aapl.written(), 1);
        assert_eq!(aapl.phase(), IngestionPhase::Waiting);
    }

    #[tokio::test]
    async fn fetch_failure_skips_write() {
        let mut provider = MockQuoteProviderPort::new();
        provider
            .expect_fetch()
            .returning(|_| Err(FetchError::RateLimited));

        let mut writer = MockQuoteWriterPort::new();
        writer.expect_append().times(0);

        let scheduler = scheduler(provider, writer, &["AAPL"]);
        assert_eq!(
            scheduler.tick_now("AAPL").await,
            Some(TickOutcome::FetchFailed)
        );

        let status = scheduler.status();
        let aapl = status.get("AAPL").unwrap();
        assert_eq!(aapl.fetch_failures(), 1);
        assert_eq!(aapl.written(), 0);
        assert_eq!(
            aapl.last_error().as_deref(),
            Some("provider rate limit exceeded")
        );
    }

    #[tokio::test]
    async fn write_failure_is_contained() {
        let mut provider = MockQuoteProviderPort::new();
        provider.expect_fetch().returning(|s| Ok(quote_for(s)));

        let mut writer = MockQuoteWriterPort::new();
        writer
            .expect_append()
            .returning(|_| Err(WriteError::Unavailable("connection refused".into())));

        let scheduler = scheduler(provider, writer, &["AAPL"]);
        assert_eq!(
            scheduler.tick_now("AAPL").await,
            Some(TickOutcome::WriteFailed)
        );
        assert_eq!(
            scheduler.tick_now("AAPL").await,
            Some(TickOutcome::WriteFailed)
        );
        assert_eq!(scheduler.status().get("AAPL").unwrap().write_failures(), 2);
    }

    #[tokio::test]
    async fn unknown_symbol_returns_none() {
        let scheduler = scheduler(
            MockQuoteProviderPort::new(),
            MockQuoteWriterPort::new(),
            &["AAPL"],
        );
        assert_eq!(scheduler.tick_now("MSFT").await, None);
    }

    #[tokio::test]
    async fn busy_symbol_is_skipped() {
        let mut writer = MockQuoteWriterPort::new();
        writer.expect_append().times(0);

        let scheduler = scheduler(MockQuoteProviderPort::new(), writer, &["AAPL"]);
        let slot = scheduler.slots.get("AAPL").unwrap();
        let _held = slot.guard.try_begin().unwrap();

        assert_eq!(scheduler.tick_now("AAPL").await, Some(TickOutcome::Skipped));
        assert_eq!(slot.status.skipped(), 1);
    }

    #[test]
    fn duplicate_symbols_collapse() {
        let mut cfg = config(&["AAPL", "MSFT"]);
        cfg.symbols.push(SymbolSchedule::with_interval(
            symbol("AAPL"),
            Duration::from_secs(60),
        ));

        let scheduler = IngestionScheduler::new(
            Arc::new(MockQuoteProviderPort::new()),
            Arc::new(MockQuoteWriterPort::new()),
            cfg,
            CancellationToken::new(),
        );

        assert_eq!(scheduler.symbols(), vec![symbol("AAPL"), symbol("MSFT")]);
        assert_eq!(
            scheduler.status().get("AAPL").unwrap().interval(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn interval_override_applies() {
        let mut cfg = config(&["AAPL"]);
        cfg.symbols.push(SymbolSchedule::with_interval(
            symbol("MSFT"),
            Duration::from_secs(60),
        ));

        let scheduler = IngestionScheduler::new(
            Arc::new(MockQuoteProviderPort::new()),
            Arc::new(MockQuoteWriterPort::new()),
            cfg,
            CancellationToken::new(),
        );

        let status = scheduler.status();
        assert_eq!(status.get("AAPL").unwrap().interval(), Duration::from_secs(5));
        assert_eq!(status.get("MSFT").unwrap().interval(), Duration::from_secs(60));
    }

    struct HangingProvider;

    #[async_trait]
    impl QuoteProviderPort for HangingProvider {
        async fn fetch(&self, _symbol: &Symbol) -> Result<Quote, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_times_out() {
        let mut writer = MockQuoteWriterPort::new();
        writer.expect_append().times(0);

        let cfg = IngestionConfig {
            fetch_timeout: Duration::from_secs(3),
            ..config(&["AAPL"])
        };
        let scheduler = IngestionScheduler::new(
            Arc::new(HangingProvider),
            Arc::new(writer),
            cfg,
            CancellationToken::new(),
        );

        assert_eq!(
            scheduler.tick_now("AAPL").await,
            Some(TickOutcome::FetchFailed)
        );
        let status = scheduler.status();
        let error = status.get("AAPL").unwrap().last_error().unwrap();
        assert!(error.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancel() {
        let mut provider = MockQuoteProviderPort::new();
        provider.expect_fetch().returning(|s| Ok(quote_for(s)));
        let mut writer = MockQuoteWriterPort::new();
        writer.expect_append().returning(|_| Ok(()));

        let cancel = CancellationToken::new();
        let scheduler = IngestionScheduler::new(
            Arc::new(provider),
            Arc::new(writer),
            config(&["AAPL"]),
            cancel.clone(),
        );
        let status = scheduler.status();

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(status.get("AAPL").unwrap().written(), 1);
    }
}
