//! HTTP Server
//!
//! Health, metrics, and the chart data contract consumed by the front end.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status with per-symbol ingestion status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ready once any snapshot was written)
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /api/symbols` - Distinct symbols in the trailing window
//! - `GET /api/chart` - Chart series for an explicit or trailing window
//! - `GET /api/chart/latest` - Last frame produced by the refresh loop
//! - `GET /api/chart/stream` - Server-sent events, one per refresh
//! - `POST /api/selection` - Change the refreshed symbol selection

mod api;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use api::{ApiError, ChartParams, SelectionRequest, SelectionResponse, SymbolsResponse};
pub use health::{HealthResponse, HealthStatus};

use crate::application::services::{IngestionStatus, SelectionHandle, WindowQueryService};
use crate::infrastructure::broadcast::SharedChartHub;

// =============================================================================
// Server State
// =============================================================================

/// Shared state for all handlers.
pub struct AppState {
    version: String,
    started_at: Instant,
    query: WindowQueryService,
    hub: SharedChartHub,
    selection: SelectionHandle,
    ingestion: Arc<IngestionStatus>,
    window: chrono::Duration,
}

impl AppState {
    /// Create new server state.
    #[must_use]
    pub fn new(
        query: WindowQueryService,
        hub: SharedChartHub,
        selection: SelectionHandle,
        ingestion: Arc<IngestionStatus>,
        window: chrono::Duration,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            query,
            hub,
            selection,
            ingestion,
            window,
        }
    }
}

/// Build the router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::liveness_handler))
        .route("/readyz", get(health::readiness_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/api/symbols", get(api::symbols_handler))
        .route("/api/chart", get(api::chart_handler))
        .route("/api/chart/latest", get(api::latest_handler))
        .route("/api/chart/stream", get(api::stream_handler))
        .route("/api/selection", post(api::selection_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Server
// =============================================================================

/// Dashboard HTTP server.
pub struct HttpServer {
    port: u16,
    state: Arc<AppState>,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<AppState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

#[cfg(test)]
mod test_support {
    use super::*;
    use crate::application::services::{IngestionConfig, IngestionScheduler, SymbolSchedule};
    use crate::application::ports::{MockQuoteProviderPort, QuoteReaderPort};
    use crate::domain::quote::Symbol;
    use crate::infrastructure::broadcast::ChartHub;

    /// State over `reader`, with an ingestion status for `symbols`.
    pub fn state_with(reader: Arc<dyn QuoteReaderPort>, symbols: &[&str]) -> Arc<AppState> {
        let config = IngestionConfig {
            symbols: symbols
                .iter()
                .map(|s| SymbolSchedule::new(Symbol::new(*s).unwrap()))
                .collect(),
            ..IngestionConfig::default()
        };
        let store = Arc::new(crate::infrastructure::persistence::InMemoryQuoteStore::new());
        let scheduler = IngestionScheduler::new(
            Arc::new(MockQuoteProviderPort::new()),
            store,
            config,
            CancellationToken::new(),
        );

        Arc::new(AppState::new(
            WindowQueryService::new(reader),
            Arc::new(ChartHub::with_defaults()),
            SelectionHandle::default(),
            scheduler.status(),
            chrono::Duration::hours(5),
        ))
    }
}
