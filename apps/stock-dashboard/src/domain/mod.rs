//! Domain Layer - Quote snapshots and chart shaping.
//!
//! Pure types and functions with no I/O. Everything that talks to the
//! provider or the store lives behind the ports in the application layer.

/// Quote observations, symbols, and time windows.
pub mod quote;

/// Grouping and projection of snapshots into chart series.
pub mod chart;
