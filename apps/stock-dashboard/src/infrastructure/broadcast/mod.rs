//! Chart Broadcast Hub
//!
//! Fans refresh frames out to every connected viewer using a tokio
//! broadcast channel, and retains the latest frame for viewers that join
//! between refreshes.
//!
//! The refresh loop never waits on viewers: a lagging receiver loses old
//! frames, which is harmless because every frame is a full snapshot of the
//! window.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::application::ports::{ChartFrame, ChartSinkPort};

/// Default number of frames buffered per receiver.
pub const DEFAULT_CAPACITY: usize = 16;

/// Central hub for chart frames.
#[derive(Debug)]
pub struct ChartHub {
    frames_tx: broadcast::Sender<Arc<ChartFrame>>,
    latest: RwLock<Option<Arc<ChartFrame>>>,
}

impl ChartHub {
    /// Create a hub buffering `capacity` frames per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frames_tx: broadcast::channel(capacity.max(1)).0,
            latest: RwLock::new(None),
        }
    }

    /// Create a hub with default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Get a new receiver for frames published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChartFrame>> {
        self.frames_tx.subscribe()
    }

    /// Most recent frame, if any refresh has completed.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<ChartFrame>> {
        self.latest.read().clone()
    }

    /// Get the number of connected viewers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.frames_tx.receiver_count()
    }
}

impl Default for ChartHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ChartSinkPort for ChartHub {
    fn publish(&self, frame: ChartFrame) {
        let frame = Arc::new(frame);
        *self.latest.write() = Some(Arc::clone(&frame));
        // No receivers is normal when no viewer is connected.
        let delivered = self.frames_tx.send(frame).unwrap_or(0);
        tracing::trace!(viewers = delivered, "Chart frame published");
    }
}

/// Shared chart hub reference.
pub type SharedChartHub = Arc<ChartHub>;
