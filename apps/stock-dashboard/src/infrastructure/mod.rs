//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Finnhub REST quote provider.
pub mod finnhub;

/// QuestDB and in-memory quote stores.
pub mod persistence;

/// Chart frame fan-out to viewers.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// Health, metrics, and chart API HTTP server.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
