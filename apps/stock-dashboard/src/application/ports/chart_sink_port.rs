//! Chart Sink Port (Driven Port)
//!
//! The rendering layer consumes frames produced by the refresh loop.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::chart::ChartData;
use crate::domain::quote::SymbolFilter;

/// One refresh result handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartFrame {
    /// Fresh chart data.
    Ready {
        /// When the frame was produced.
        generated_at: DateTime<Utc>,
        /// Shaped series.
        chart: ChartData,
    },
    /// The query failed; viewers keep showing their previous data.
    Stale {
        /// When the frame was produced.
        generated_at: DateTime<Utc>,
        /// Selection that was being refreshed.
        selection: SymbolFilter,
        /// Failure description.
        reason: String,
    },
}

impl ChartFrame {
    /// Whether this frame carries fresh data.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Receiver of refresh frames.
pub trait ChartSinkPort: Send + Sync {
    /// Publish a frame. Must not block.
    fn publish(&self, frame: ChartFrame);
}
