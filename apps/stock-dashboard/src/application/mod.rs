//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for the provider, store, and chart sink.
pub mod ports;

/// Application services for ingestion, querying, and refresh.
pub mod services;
