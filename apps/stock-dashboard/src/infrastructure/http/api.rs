//! Chart data API handlers.
//!
//! JSON contract for the front end: per symbol, two parallel time-ordered
//! series plus the distinct set of known symbols.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use super::AppState;
use crate::application::ports::{ChartFrame, QueryError};
use crate::domain::chart::ChartData;
use crate::domain::quote::{Symbol, SymbolFilter, TimeWindow};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Query parameters of `GET /api/chart`.
#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    /// Symbol filter; absent or empty means all symbols.
    pub symbol: Option<String>,
    /// Window start; defaults to `end - window`.
    pub start: Option<DateTime<Utc>>,
    /// Window end; defaults to now.
    pub end: Option<DateTime<Utc>>,
}

/// Response of `GET /api/symbols`.
#[derive(Debug, Serialize)]
pub struct SymbolsResponse {
    /// Window the symbols were collected from.
    pub window: TimeWindow,
    /// Distinct symbols, sorted.
    pub symbols: Vec<Symbol>,
}

/// Body of `POST /api/selection`.
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    /// Symbol to show, or `null` for all.
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Response of `POST /api/selection`.
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    /// Selection now in effect.
    pub selection: SymbolFilter,
}

/// API error, rendered as a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The store could not answer.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Query(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub(super) async fn symbols_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SymbolsResponse>, ApiError> {
    let window = TimeWindow::trailing(Utc::now(), state.window);
    let symbols = state.query.known_symbols(window).await?;
    Ok(Json(SymbolsResponse { window, symbols }))
}

pub(super) async fn chart_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChartParams>,
) -> Result<Json<ChartData>, ApiError> {
    let end = params.end.unwrap_or_else(Utc::now);
    let start = params.start.unwrap_or(end - state.window);
    let filter = SymbolFilter::from_optional(params.symbol.as_deref());

    let chart = state
        .query
        .chart(TimeWindow::new(start, end), &filter)
        .await?;
    Ok(Json(chart))
}

pub(super) async fn latest_handler(State(state): State<Arc<AppState>>) -> Response {
    state.hub.latest().map_or_else(
        || StatusCode::NO_CONTENT.into_response(),
        |frame| Json(frame.as_ref().clone()).into_response(),
    )
}

pub(super) async fn stream_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe first so no frame falls between the snapshot and the stream.
    let updates = BroadcastStream::new(state.hub.subscribe()).filter_map(Result::ok);
    let initial = tokio_stream::iter(state.hub.latest());

    let events = initial
        .chain(updates)
        .map(|frame| Ok(frame_event(&frame)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub(super) async fn selection_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> (StatusCode, Json<SelectionResponse>) {
    let selection = SymbolFilter::from_optional(request.symbol.as_deref());
    tracing::info!(selection = ?selection.symbol(), "Selection changed via API");
    state.selection.select(selection.clone());
    (StatusCode::ACCEPTED, Json(SelectionResponse { selection }))
}

fn frame_event(frame: &ChartFrame) -> Event {
    let name = if frame.is_ready() { "ready" } else { "stale" };
    Event::default()
        .event(name)
        .json_data(frame)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
