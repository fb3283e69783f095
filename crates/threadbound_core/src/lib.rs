//! # THREADBOUND Core
//!
//! Thread-affinity kernel: one designated thread owns a mutable,
//! unsynchronized collection, and every other thread marshals its edits
//! onto that thread.
//!
//! ## Architecture Rules
//!
//! 1. **The collection never locks across calls** - it is the hazard under test
//! 2. **The executor is the only legitimate mutator** - workers get a
//!    [`Submitter`], never the model
//! 3. **Tasks are values** - a command plus origin and sequence number, so
//!    order can be checked and replayed
//!
//! ## Example
//!
//! ```rust,ignore
//! use threadbound_core::{
//!     AffinityExecutor, ExecutorConfig, MutationDecision, OrderedItemCollection,
//!     OriginId, SEED_ITEM,
//! };
//!
//! let executor = AffinityExecutor::spawn(
//!     OrderedItemCollection::with_seed(SEED_ITEM),
//!     ExecutorConfig::default(),
//! )?;
//! executor.submit(OriginId(1), MutationDecision::Insert(4))?;
//! let count = executor.invoke_and_wait(|model| model.count())?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod collection;
pub mod error;
pub mod generator;
pub mod mutation;
pub mod sync;

pub use collection::{Item, ItemSequence, OrderedItemCollection, SharedItemCollection, SEED_ITEM};
pub use error::{ThreadboundError, ThreadboundResult};
pub use generator::{magnitude, next_decision, GeneratorState, MutationGenerator};
pub use mutation::{apply_decision, AppliedMutation, MutationDecision};
pub use sync::{
    AffinityExecutor, AffinityModel, CancellationToken, ExecutorConfig, ExecutorStats, OriginId,
    Submitter, Task, TaskRecord,
};
