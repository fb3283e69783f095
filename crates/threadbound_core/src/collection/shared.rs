//! # Shared Unguarded View
//!
//! A cloneable handle onto one [`OrderedItemCollection`] that any thread may
//! call into.
//!
//! Every individual call is memory-safe: the item storage sits behind a
//! short per-call guard. Nothing else is. In particular:
//!
//! - `count()` followed by `remove_at(i % count)` is two calls, and another
//!   thread may shrink the collection in between
//! - a mutation is two phases: shift the items, then write back the selection
//!   computed from what phase one saw. A second writer landing between the
//!   phases has its bookkeeping silently overwritten
//!
//! ```text
//!   Thread A (insert)              Thread B (remove)
//!   ─────────────────              ─────────────────
//!   shift items, read sel=0
//!                                  shift items, read sel=0
//!                                  write sel=Some(0)
//!   write sel=Some(1)   ← lost update, selection now past the end
//! ```
//!
//! When exactly one thread (the affinity thread) makes the calls, none of
//! this can happen and [`audit`](SharedItemCollection::audit) always passes.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use super::{selection_after_insert, selection_after_remove, Item, ItemSequence, OrderedItemCollection};
use crate::error::ThreadboundResult;

/// Cloneable, cross-thread handle onto a single item collection.
///
/// Cloning shares the underlying collection. Handing a clone to a thread
/// other than the affinity thread is how the negative control bypasses the
/// executor.
#[derive(Clone, Debug)]
pub struct SharedItemCollection {
    inner: Arc<Mutex<OrderedItemCollection>>,
}

impl SharedItemCollection {
    /// Creates a shared collection holding exactly `seed`.
    #[must_use]
    pub fn with_seed(seed: Item) -> Self {
        Self::from_collection(OrderedItemCollection::with_seed(seed))
    }

    /// Wraps an existing collection.
    #[must_use]
    pub fn from_collection(collection: OrderedItemCollection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collection)),
        }
    }

    /// Returns the current number of items.
    ///
    /// The answer may be stale by the time the caller acts on it.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.lock().count()
    }

    /// Returns the item at `index`.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`](crate::ThreadboundError::InvalidIndex)
    /// if `index` is out of bounds at the moment of the call.
    pub fn item_at(&self, index: usize) -> ThreadboundResult<Item> {
        self.inner.lock().item_at(index)
    }

    /// Returns the selected index.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.inner.lock().selected()
    }

    /// Copies the current items.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Item> {
        self.inner.lock().as_slice().to_vec()
    }

    /// Copies the whole collection, selection included.
    #[must_use]
    pub fn to_collection(&self) -> OrderedItemCollection {
        self.inner.lock().clone()
    }

    /// Returns how many handles share this collection.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Inserts `value` at `index`. Two phases, no atomicity between them.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`](crate::ThreadboundError::InvalidIndex)
    /// if `index > count()` when phase one runs.
    pub fn insert_at(&self, index: usize, value: Item) -> ThreadboundResult<()> {
        let seen = {
            let mut guard = self.inner.lock();
            guard.shift_insert(index, value)?;
            guard.selected()
        };
        // Change notifications would fire here
        thread::yield_now();
        self.inner
            .lock()
            .set_selected(selection_after_insert(seen, index));
        Ok(())
    }

    /// Removes the item at `index`. Two phases, no atomicity between them.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`](crate::ThreadboundError::InvalidIndex)
    /// if `index >= count()` when phase one runs.
    pub fn remove_at(&self, index: usize) -> ThreadboundResult<Item> {
        let (removed, seen, len_before) = {
            let mut guard = self.inner.lock();
            let len_before = guard.count();
            let removed = guard.shift_remove(index)?;
            (removed, guard.selected(), len_before)
        };
        thread::yield_now();
        self.inner
            .lock()
            .set_selected(selection_after_remove(seen, index, len_before));
        Ok(removed)
    }

    /// Verifies the selection invariant.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::CorruptedState`](crate::ThreadboundError::CorruptedState)
    /// if a lost bookkeeping update left the selection out of range.
    pub fn audit(&self) -> ThreadboundResult<()> {
        self.inner.lock().audit()
    }
}

impl ItemSequence for SharedItemCollection {
    fn count(&self) -> usize {
        SharedItemCollection::count(self)
    }

    fn insert_at(&mut self, index: usize, value: Item) -> ThreadboundResult<()> {
        SharedItemCollection::insert_at(self, index, value)
    }

    fn remove_at(&mut self, index: usize) -> ThreadboundResult<Item> {
        SharedItemCollection::remove_at(self, index)
    }

    fn audit(&self) -> ThreadboundResult<()> {
        SharedItemCollection::audit(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ThreadboundError, SEED_ITEM};

    #[test]
    fn test_single_thread_matches_plain_collection() {
        let shared = SharedItemCollection::with_seed(SEED_ITEM);
        let mut plain = OrderedItemCollection::with_seed(SEED_ITEM);

        for (index, value) in [(0, 10), (1, 12), (3, 14), (0, 16)] {
            shared.insert_at(index, value).unwrap();
            plain.insert_at(index, value).unwrap();
        }
        assert_eq!(shared.remove_at(2), plain.remove_at(2));
        assert_eq!(shared.remove_at(0), plain.remove_at(0));

        assert_eq!(shared.to_collection(), plain);
        assert!(shared.audit().is_ok());
    }

    #[test]
    fn test_clones_share_storage() {
        let shared = SharedItemCollection::with_seed(SEED_ITEM);
        let other = shared.clone();
        assert_eq!(shared.handle_count(), 2);

        other.insert_at(0, 42).unwrap();
        assert_eq!(shared.snapshot(), vec![42, SEED_ITEM]);
    }

    #[test]
    fn test_stale_index_is_reported() {
        let shared = SharedItemCollection::with_seed(SEED_ITEM);
        let stale_count = shared.count();
        shared.remove_at(0).unwrap();

        // Acting on the stale count is exactly the unguarded hazard
        let err = shared.remove_at(stale_count - 1).unwrap_err();
        assert_eq!(err, ThreadboundError::InvalidIndex { index: 0, count: 0 });
    }
}
