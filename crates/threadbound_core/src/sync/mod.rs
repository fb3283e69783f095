//! # Affinity Synchronization
//!
//! ONE thread owns the model. Everyone else submits.
//!
//! ## The Problem
//!
//! ```text
//! Worker 1:  count() ─────────── remove_at(i % count)
//! Worker 2:        remove_at(0)
//!
//! Without a single owner: STALE COUNT → INVALID INDEX
//! ```
//!
//! ## The Solution: Thread Affinity
//!
//! ```text
//! Worker 1 ──submit──┐
//! Worker 2 ──submit──┼──> FIFO queue ──> affinity thread ──> model
//! Harness  ──invoke──┘                   (one task at a time)
//! ```
//!
//! The model is moved into the affinity thread at spawn time. Workers only
//! ever hold a [`Submitter`]; there is no API that hands them the model.

mod cancel;
mod executor;
mod task;

pub use cancel::CancellationToken;
pub use executor::{
    AffinityExecutor, AffinityModel, ExecutorConfig, ExecutorStats, Submitter,
};
pub use task::{OriginId, Task, TaskRecord};
