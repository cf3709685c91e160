//! Ingestion Pipeline Integration Tests
//!
//! Drives the scheduler against a scripted provider and the in-memory store
//! under paused time, then reads the result back through the window query
//! service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use common::{FakeProvider, symbol};
use stock_dashboard::{
    InMemoryQuoteStore, IngestionConfig, IngestionScheduler, IngestionStatus, SymbolFilter,
    SymbolSchedule, TimeWindow, WindowQueryService,
};

struct Pipeline {
    provider: Arc<FakeProvider>,
    store: Arc<InMemoryQuoteStore>,
    status: Arc<IngestionStatus>,
    cancel: CancellationToken,
    scheduler: Option<IngestionScheduler>,
}

impl Pipeline {
    fn new(provider: FakeProvider, schedules: Vec<SymbolSchedule>) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(InMemoryQuoteStore::new());
        let cancel = CancellationToken::new();
        let config = IngestionConfig {
            frequency: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(1),
            symbols: schedules,
        };
        let scheduler =
            IngestionScheduler::new(provider.clone(), store.clone(), config, cancel.clone());

        Self {
            provider,
            store,
            status: scheduler.status(),
            cancel,
            scheduler: Some(scheduler),
        }
    }

    fn with_symbols(provider: FakeProvider, symbols: &[&str]) -> Self {
        let schedules = symbols
            .iter()
            .map(|s| SymbolSchedule::new(symbol(s)))
            .collect();
        Self::new(provider, schedules)
    }

    /// Run the scheduler for `elapsed` of (paused) time, then shut it down.
    async fn run_for(&mut self, elapsed: Duration) {
        let scheduler = self.scheduler.take().expect("pipeline already ran");
        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(elapsed).await;
        self.cancel.cancel();
        handle.await.unwrap();
    }

    fn written(&self, s: &str) -> u64 {
        self.status.get(s).unwrap().written()
    }

    fn query(&self) -> WindowQueryService {
        WindowQueryService::new(self.store.clone())
    }
}

fn trailing_window() -> TimeWindow {
    TimeWindow::trailing(Utc::now(), chrono::Duration::hours(5))
}

#[tokio::test(start_paused = true)]
async fn two_symbols_end_to_end() {
    let mut pipeline = Pipeline::with_symbols(FakeProvider::new(), &["AAPL", "MSFT"]);
    pipeline.run_for(Duration::from_secs(11)).await;

    assert!(pipeline.store.rows_for("AAPL").len() >= 2);
    assert!(pipeline.store.rows_for("MSFT").len() >= 2);

    let query = pipeline.query();
    let chart = query
        .chart(trailing_window(), &SymbolFilter::All)
        .await
        .unwrap();
    assert_eq!(chart.series.len(), 2);
    for series in &chart.series {
        assert_eq!(series.price.len(), series.percent_change.len());
        assert!(series.price.windows(2).all(|w| w[0].time <= w[1].time));
    }

    let msft = query
        .query(trailing_window(), &SymbolFilter::from_optional(Some("MSFT")))
        .await
        .unwrap();
    assert!(!msft.is_empty());
    assert!(msft.iter().all(|s| s.symbol.as_str() == "MSFT"));
}

#[tokio::test(start_paused = true)]
async fn failing_symbol_does_not_affect_others() {
    let mut pipeline =
        Pipeline::with_symbols(FakeProvider::new().failing("BAD"), &["BAD", "GOOD"]);
    pipeline.run_for(Duration::from_secs(11)).await;

    // Ticks at 0s, 5s and 10s for each symbol.
    assert_eq!(pipeline.written("GOOD"), 3);
    assert_eq!(pipeline.written("BAD"), 0);

    let bad = pipeline.status.get("BAD").unwrap();
    assert_eq!(bad.fetch_failures(), 3);
    assert!(bad.last_error().unwrap().contains("500"));

    // One call per tick, no retries.
    assert_eq!(pipeline.provider.calls("BAD"), 3);
    assert!(pipeline.store.rows_for("BAD").is_empty());

    let symbols = pipeline.query().known_symbols(trailing_window()).await.unwrap();
    let names: Vec<_> = symbols.iter().map(|s| s.as_str()).collect();
    assert_eq!(names, vec!["GOOD"]);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_skips_ticks_then_resumes() {
    let provider = FakeProvider::new().delayed("SLOW", &[Duration::from_secs(12)]);
    let mut pipeline = Pipeline::with_symbols(provider, &["FAST", "SLOW"]);
    pipeline.run_for(Duration::from_secs(21)).await;

    // The 0s fetch runs until 12s, so the 5s and 10s ticks are skipped.
    // The 15s and 20s ticks run normally.
    let slow = pipeline.status.get("SLOW").unwrap();
    assert_eq!(slow.skipped(), 2);
    assert_eq!(slow.written(), 3);
    assert_eq!(pipeline.provider.calls("SLOW"), 3);

    let fast = pipeline.status.get("FAST").unwrap();
    assert_eq!(fast.skipped(), 0);
    assert_eq!(fast.written(), 5);
}

#[tokio::test(start_paused = true)]
async fn per_symbol_interval_override() {
    let schedules = vec![
        SymbolSchedule::new(symbol("AAPL")),
        SymbolSchedule::with_interval(symbol("TSLA"), Duration::from_secs(2)),
    ];
    let mut pipeline = Pipeline::new(FakeProvider::new(), schedules);
    pipeline.run_for(Duration::from_secs(5) + Duration::from_millis(500)).await;

    // AAPL at 0s and 5s; TSLA at 0s, 2s and 4s.
    assert_eq!(pipeline.written("AAPL"), 2);
    assert_eq!(pipeline.written("TSLA"), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_hung_tick_after_grace() {
    let provider = FakeProvider::new().delayed("HUNG", &[Duration::from_secs(25)]);
    let mut pipeline = Pipeline::with_symbols(provider, &["HUNG"]);

    let started = tokio::time::Instant::now();
    pipeline.run_for(Duration::from_secs(1)).await;

    // One second of running plus one second of grace, not the full fetch.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(pipeline.written("HUNG"), 0);
    assert!(pipeline.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn snapshots_carry_fire_time_and_provider_values() {
    let mut pipeline = Pipeline::with_symbols(FakeProvider::new(), &["AAPL"]);
    let before = Utc::now();
    pipeline.run_for(Duration::from_secs(1)).await;

    let rows = pipeline.store.rows_for("AAPL");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(row.insert_time >= before);
    assert!(row.insert_time <= Utc::now());
    assert!((row.current_price - 101.0).abs() < f64::EPSILON);
    assert!(row.trade_time.is_some());
}
