//! Stock Dashboard Binary
//!
//! Starts quote ingestion, the chart refresh loop, and the HTTP server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stock-dashboard
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `SMD_API_KEY`: Finnhub API key
//! - `SMD_SYMBOLS`: Comma-separated symbols, `SYMBOL@secs` for a custom interval
//!
//! ## Optional
//! - `SMD_FREQUENCY`: Fetch interval in seconds (default: 5)
//! - `SMD_FETCH_TIMEOUT_SECS`: Provider call timeout (default: 10)
//! - `SMD_FINNHUB_URL`: Finnhub base URL (default: <https://finnhub.io/api/v1>)
//! - `SMD_DATABASE_URL`: QuestDB PG wire URL, or `memory://` (default: QuestDB on localhost:8812)
//! - `SMD_DATABASE_POOL_SIZE`: Pooled connections (default: 3)
//! - `SMD_STORE_TRADE_TIME`: Whether the table has `tradets` (default: true)
//! - `SMD_STORE_CREATE_TABLE`: Create the table at startup (default: true)
//! - `SMD_GRAPH_INTERVAL`: Chart refresh interval in seconds (default: 10)
//! - `SMD_WINDOW_HOURS`: Trailing chart window in hours (default: 5)
//! - `SMD_HTTP_PORT`: HTTP port (default: 8050)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use stock_dashboard::application::ports::{QuoteReaderPort, QuoteWriterPort};
use stock_dashboard::infrastructure::telemetry;
use stock_dashboard::{
    AppState, ChartHub, DashboardConfig, FinnhubClient, HttpServer, InMemoryQuoteStore,
    IngestionScheduler, QuestDbQuoteStore, RefreshLoop, SelectionHandle, WindowQueryService,
    init_metrics,
};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("failed to install rustls crypto provider");
    }

    load_dotenv();

    // Initialize telemetry (tracing + optional OpenTelemetry)
    let telemetry_guard = telemetry::init();

    tracing::info!(
        otel_export = telemetry_guard.is_exporting(),
        "Starting Stock Dashboard"
    );

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = DashboardConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Store: one pool shared by ingestion and queries
    let store = build_store(&config).await?;

    // Quote provider
    let provider =
        Arc::new(FinnhubClient::new(&config.finnhub_config()).context("invalid Finnhub settings")?);

    // Ingestion scheduler
    let mut ingestion_config = config.ingestion_config();
    ingestion_config.shutdown_grace = SHUTDOWN_TIMEOUT;
    let scheduler = IngestionScheduler::new(
        provider,
        Arc::clone(&store.writer),
        ingestion_config,
        shutdown_token.clone(),
    );
    let ingestion_status = scheduler.status();

    // Refresh loop and chart hub
    let query_service = WindowQueryService::new(Arc::clone(&store.reader));
    let chart_hub = Arc::new(ChartHub::with_defaults());
    let selection = SelectionHandle::default();
    let refresh = RefreshLoop::new(
        query_service.clone(),
        Arc::clone(&chart_hub) as _,
        config.refresh_config(),
        &selection,
        shutdown_token.clone(),
    );

    // HTTP server
    let app_state = Arc::new(AppState::new(
        query_service,
        Arc::clone(&chart_hub),
        selection,
        ingestion_status,
        config.display.window,
    ));
    let http_server = HttpServer::new(
        config.server.http_port,
        app_state,
        shutdown_token.clone(),
    );

    let mut tasks = JoinSet::new();
    tasks.spawn(scheduler.run());
    tasks.spawn(refresh.run());
    let http_shutdown = shutdown_token.clone();
    tasks.spawn(async move {
        if let Err(e) = http_server.run().await {
            tracing::error!(error = %e, "HTTP server error");
            // Without the API there is nothing to serve; stop the service.
            http_shutdown.cancel();
        }
    });

    tracing::info!("Stock dashboard ready");

    tokio::select! {
        () = await_shutdown() => {}
        () = shutdown_token.cancelled() => {
            tracing::warn!("Component failure, initiating shutdown");
        }
    }
    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Shutdown timeout elapsed, abandoning remaining tasks");
        tasks.abort_all();
    }

    if let Some(questdb) = &store.questdb {
        questdb.close().await;
        tracing::info!("QuestDB pool closed");
    }

    tracing::info!("Stock dashboard stopped");
    Ok(())
}

/// Selected quote store, behind both port views.
struct Store {
    writer: Arc<dyn QuoteWriterPort>,
    reader: Arc<dyn QuoteReaderPort>,
    questdb: Option<Arc<QuestDbQuoteStore>>,
}

/// Select and prepare the quote store.
///
/// A QuestDB outage at startup is not fatal: the pool connects lazily and
/// appends fail per tick until the database is back.
async fn build_store(config: &DashboardConfig) -> anyhow::Result<Store> {
    if config.store.is_in_memory() {
        tracing::warn!("Using in-memory store, data is lost on exit");
        let store = Arc::new(InMemoryQuoteStore::new());
        return Ok(Store {
            writer: Arc::clone(&store) as _,
            reader: store,
            questdb: None,
        });
    }

    let store = Arc::new(
        QuestDbQuoteStore::connect_lazy(&config.questdb_config())
            .context("failed to configure QuestDB pool")?,
    );
    if config.store.create_table
        && let Err(e) = store.ensure_schema().await
    {
        tracing::warn!(error = %e, "Could not prepare quotes table, continuing without it");
    }
    Ok(Store {
        writer: Arc::clone(&store) as _,
        reader: Arc::clone(&store) as _,
        questdb: Some(store),
    })
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &DashboardConfig) {
    let symbols: Vec<&str> = config
        .ingestion
        .symbols
        .iter()
        .map(|s| s.symbol.as_str())
        .collect();
    tracing::info!(
        symbols = ?symbols,
        frequency_secs = config.ingestion.frequency.as_secs(),
        graph_interval_secs = config.display.graph_interval.as_secs(),
        window_hours = config.display.window.num_hours(),
        http_port = config.server.http_port,
        in_memory_store = config.store.is_in_memory(),
        "Configuration loaded"
    );
    tracing::debug!(
        finnhub_url = %config.ingestion.finnhub_url,
        pool_size = config.store.pool_size,
        trade_time = config.store.trade_time,
        "Adapter settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
