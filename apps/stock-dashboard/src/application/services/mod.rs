//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `IngestionScheduler`: Per-symbol fetch-and-append timers
//! - `WindowQueryService`: Windowed, grouped reads from the store
//! - `RefreshLoop`: Periodic chart refresh for the current selection

pub mod ingestion;
pub mod refresh;
pub mod window_query;

pub use ingestion::{
    IngestionConfig, IngestionPhase, IngestionScheduler, IngestionStatus, SymbolIngestionReport,
    SymbolSchedule,
};
pub use refresh::{RefreshConfig, RefreshLoop, SelectionHandle};
pub use window_query::WindowQueryService;
