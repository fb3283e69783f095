//! # Item Collections
//!
//! The shared resource whose access discipline is under test.
//!
//! ```text
//!   OrderedItemCollection      plain data, &mut access, no locks at all
//!            │
//!            ▼ wrapped by
//!   SharedItemCollection       cloneable handle, each call memory-safe,
//!                              NO atomicity across calls or across the
//!                              two phases of a single mutation
//! ```
//!
//! Both implement [`ItemSequence`], so the exact same mutation logic runs
//! against either one. Only the calling discipline differs.

mod ordered;
mod shared;

pub use ordered::OrderedItemCollection;
pub use shared::SharedItemCollection;

pub(crate) use ordered::{selection_after_insert, selection_after_remove};

use crate::error::ThreadboundResult;

/// A single collection element.
///
/// Values live in `[0, i32::MAX]`; they carry no identity beyond value and
/// position.
pub type Item = i32;

/// The value the collection is seeded with at startup.
pub const SEED_ITEM: Item = Item::MAX;

/// Index-based access to an ordered sequence of items.
pub trait ItemSequence {
    /// Current number of items.
    fn count(&self) -> usize;

    /// Inserts `value` at `index`, shifting later items right.
    ///
    /// `index == count()` appends.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`](crate::ThreadboundError::InvalidIndex)
    /// if `index > count()`.
    fn insert_at(&mut self, index: usize, value: Item) -> ThreadboundResult<()>;

    /// Removes and returns the item at `index`, shifting later items left.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`](crate::ThreadboundError::InvalidIndex)
    /// if `index >= count()`, including any call on an empty collection.
    fn remove_at(&mut self, index: usize) -> ThreadboundResult<Item>;

    /// Checks the selection bookkeeping against the item count.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::CorruptedState`](crate::ThreadboundError::CorruptedState)
    /// describing the violated invariant.
    fn audit(&self) -> ThreadboundResult<()>;
}
