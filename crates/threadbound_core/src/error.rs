//! # Error Types
//!
//! All errors that can surface from the collection, the executor and the
//! worker loops built on top of them.

use thiserror::Error;

use crate::sync::OriginId;

/// Errors that can occur in THREADBOUND.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadboundError {
    /// An index passed to insert/remove/read is outside the current bounds.
    ///
    /// Under the unguarded path this is usually a stale `count()` read that
    /// raced a concurrent mutation.
    #[error("invalid index {index} for collection of {count} items")]
    InvalidIndex {
        /// The index that was requested.
        index: usize,
        /// The item count observed at the moment of the failed call.
        count: usize,
    },

    /// A worker loop observed its cancellation token.
    ///
    /// Expected, not a fault. Loops swallow it and exit cleanly.
    #[error("worker interrupted")]
    Interrupted,

    /// An internal invariant of the collection was found violated.
    #[error("corrupted state: {0}")]
    CorruptedState(String),

    /// The affinity executor has shut down and no longer accepts work.
    #[error("affinity executor has shut down")]
    ExecutorShutDown,

    /// A blocking call into the affinity thread was made from the affinity
    /// thread itself.
    #[error("blocking affinity call from the affinity thread would deadlock")]
    WouldDeadlock,

    /// No live worker carries this id.
    #[error("no running worker with id {0}")]
    UnknownWorker(OriginId),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The OS refused to spawn a thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

impl ThreadboundError {
    /// Returns `true` for the anomalies the unguarded path is expected to
    /// produce (index races and bookkeeping corruption).
    #[must_use]
    pub fn is_hazard(&self) -> bool {
        matches!(self, Self::InvalidIndex { .. } | Self::CorruptedState(_))
    }
}

/// Result type for THREADBOUND operations.
pub type ThreadboundResult<T> = Result<T, ThreadboundError>;
