//! Refresh Loop
//!
//! One shared timer, independent of the ingestion timers, that re-queries
//! the trailing window for the current selection and hands the result to
//! the chart sink. Changing the selection wakes the loop immediately.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::window_query::WindowQueryService;
use crate::application::ports::{ChartFrame, ChartSinkPort};
use crate::domain::quote::{SymbolFilter, TimeWindow};
use crate::infrastructure::metrics;

/// Refresh loop configuration.
#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// Time between refreshes.
    pub interval: Duration,
    /// Length of the trailing query window.
    pub window: chrono::Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            window: chrono::Duration::hours(5),
        }
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Shared symbol selection. Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct SelectionHandle {
    tx: Arc<watch::Sender<SymbolFilter>>,
}

impl SelectionHandle {
    /// Create a handle with an initial selection.
    #[must_use]
    pub fn new(initial: SymbolFilter) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Change the selection. Subscribers are woken only if it differs.
    pub fn select(&self, filter: SymbolFilter) {
        self.tx.send_if_modified(|current| {
            if *current == filter {
                false
            } else {
                *current = filter;
                true
            }
        });
    }

    /// Current selection.
    #[must_use]
    pub fn current(&self) -> SymbolFilter {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every selection change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SymbolFilter> {
        self.tx.subscribe()
    }
}

impl Default for SelectionHandle {
    fn default() -> Self {
        Self::new(SymbolFilter::All)
    }
}

// =============================================================================
// Refresh Loop
// =============================================================================

/// Periodic trailing-window query feeding a chart sink.
pub struct RefreshLoop {
    service: WindowQueryService,
    sink: Arc<dyn ChartSinkPort>,
    config: RefreshConfig,
    selection: watch::Receiver<SymbolFilter>,
    cancel: CancellationToken,
}

impl RefreshLoop {
    /// Create a refresh loop.
    #[must_use]
    pub fn new(
        service: WindowQueryService,
        sink: Arc<dyn ChartSinkPort>,
        config: RefreshConfig,
        selection: &SelectionHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service,
            sink,
            config,
            selection: selection.subscribe(),
            cancel,
        }
    }

    /// Query the trailing window for the current selection and publish one
    /// frame. Returns whether the frame was ready.
    pub async fn refresh_once(&mut self) -> bool {
        let filter = self.selection.borrow_and_update().clone();
        let now = Utc::now();
        let window = TimeWindow::trailing(now, self.config.window);

        let frame = match self.service.chart(window, &filter).await {
            Ok(chart) => ChartFrame::Ready {
                generated_at: now,
                chart,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Refresh query failed, publishing stale frame");
                ChartFrame::Stale {
                    generated_at: now,
                    selection: filter,
                    reason: e.to_string(),
                }
            }
        };

        let ready = frame.is_ready();
        metrics::record_refresh(ready);
        self.sink.publish(frame);
        ready
    }

    /// Run until cancelled. The first refresh happens immediately.
    pub async fn run(mut self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs_f64(),
            window_secs = self.config.window.num_seconds(),
            "Refresh loop started"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut selection_open = true;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.refresh_once().await;
                }
                changed = self.selection.changed(), if selection_open => {
                    if changed.is_err() {
                        selection_open = false;
                        continue;
                    }
                    tracing::debug!(selection = ?self.selection.borrow().symbol(), "Selection changed");
                    self.refresh_once().await;
                    interval.reset();
                }
            }
        }

        tracing::info!("Refresh loop stopped");
    }
}
