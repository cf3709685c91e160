#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Stock Dashboard - Quote Ingestion and Live Chart Feed
//!
//! Periodically pulls quotes from Finnhub for a configured set of symbols,
//! appends them to an append-only time-series store (QuestDB), and serves a
//! refreshing feed of recent price and percent-change history per symbol.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote snapshots and chart shaping
//!   - `quote`: Symbols, quotes, snapshots, time windows, filters
//!   - `chart`: Grouping and projection into per-symbol series
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Quote provider, quote store, chart sink
//!   - `services`: Ingestion scheduler, window queries, refresh loop
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `finnhub`: REST quote provider
//!   - `persistence`: QuestDB and in-memory stores
//!   - `broadcast`: Chart frame fan-out
//!   - `http`: Health, metrics, and chart API
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//!  per-symbol timers                              refresh timer
//!        │                                              │
//!        ▼                                              ▼
//!  Finnhub ──► QuoteSnapshot ──► QuestDB ◄── WindowQueryService ──► ChartHub ──► viewers
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote snapshots and chart shaping with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::chart::{ChartData, SeriesPoint, SymbolSeries};
pub use domain::quote::{Quote, QuoteSnapshot, Symbol, SymbolFilter, TimeWindow};

// Ports
pub use application::ports::{
    ChartFrame, ChartSinkPort, FetchError, QueryError, QuoteProviderPort, QuoteReaderPort,
    QuoteWriterPort, WriteError,
};

// Services
pub use application::services::{
    IngestionConfig, IngestionScheduler, IngestionStatus, RefreshConfig, RefreshLoop,
    SelectionHandle, SymbolSchedule, WindowQueryService,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, DashboardConfig};

// Adapters (for integration tests)
pub use infrastructure::broadcast::{ChartHub, SharedChartHub};
pub use infrastructure::finnhub::{FinnhubClient, FinnhubConfig};
pub use infrastructure::http::{AppState, HttpServer, HttpServerError};
pub use infrastructure::persistence::{InMemoryQuoteStore, QuestDbQuoteStore};

// Metrics
pub use infrastructure::metrics::{TickOutcome, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
