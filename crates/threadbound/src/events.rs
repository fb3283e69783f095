//! # Harness Event System
//!
//! Worker lifecycle and hazard reports flowing to whoever plays the UI.
//!
//! ```text
//! ┌──────────────┐
//! │ Safe worker  │──┐
//! └──────────────┘  │    ┌─────────────┐    ┌─────────────┐
//! ┌──────────────┐  ├───>│   Event     │───>│  Harness /  │
//! │ Unguarded    │──┘    │   Channel   │    │  CLI        │
//! │ worker       │       └─────────────┘    └─────────────┘
//! └──────────────┘
//! ```
//!
//! Bounded channel; senders never block. When the channel is full the event
//! is dropped, so a flood of anomalies cannot stall a worker.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use threadbound_core::{OriginId, ThreadboundError};

use crate::worker::{WorkerKind, WorkerStats};

/// Events published by workers.
#[derive(Clone, Debug)]
pub enum HarnessEvent {
    /// A worker thread entered its loop.
    WorkerStarted {
        /// Worker id.
        worker: OriginId,
        /// Access discipline.
        kind: WorkerKind,
    },

    /// A worker thread left its loop.
    WorkerStopped {
        /// Worker id.
        worker: OriginId,
        /// Access discipline.
        kind: WorkerKind,
        /// Final counters.
        stats: WorkerStats,
    },

    /// Unguarded access produced an index race or corrupted bookkeeping.
    Anomaly {
        /// Worker that observed it.
        worker: OriginId,
        /// What went wrong.
        error: ThreadboundError,
    },
}

/// Event bus between workers and the harness.
pub struct EventBus {
    sender: Sender<HarnessEvent>,
    receiver: Receiver<HarnessEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// Handle for publishing events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<HarnessEvent>,
}

impl EventSender {
    /// Publishes an event (non-blocking).
    ///
    /// Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: HarnessEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            // Full: the consumer is behind, drop rather than stall a worker
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for consuming events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<HarnessEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<HarnessEvent> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<HarnessEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
