//! Insertion-ordered item collection with combo-box style selection.

use super::{Item, ItemSequence};
use crate::error::{ThreadboundError, ThreadboundResult};

/// An unsynchronized, insertion-ordered sequence of items.
///
/// Besides the items themselves the collection tracks a *selected index*,
/// the way a list widget model does:
///
/// - `selected` is `None` exactly when the collection is empty
/// - otherwise `selected < count()`
///
/// # Thread Safety
///
/// This type is NOT thread-safe and does not try to be. Mutation takes
/// `&mut self`; hand it to one owner (normally the affinity executor) and
/// route every edit through that owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderedItemCollection {
    /// Items in display order.
    items: Vec<Item>,
    /// Selected position, if any.
    selected: Option<usize>,
}

impl OrderedItemCollection {
    /// Creates an empty collection with no selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding exactly `seed` at index 0, selected.
    #[must_use]
    pub fn with_seed(seed: Item) -> Self {
        Self {
            items: vec![seed],
            selected: Some(0),
        }
    }

    /// Returns the number of items.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection holds no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at `index`.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`] if `index >= count()`.
    pub fn item_at(&self, index: usize) -> ThreadboundResult<Item> {
        self.items
            .get(index)
            .copied()
            .ok_or(ThreadboundError::InvalidIndex {
                index,
                count: self.items.len(),
            })
    }

    /// Returns the selected index.
    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Returns the selected item, if the selection points at one.
    #[must_use]
    pub fn selected_item(&self) -> Option<Item> {
        self.selected.and_then(|index| self.items.get(index).copied())
    }

    /// Returns the items in order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    /// Inserts `value` at `index` and keeps the selection on the same item.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`] if `index > count()`.
    pub fn insert_at(&mut self, index: usize, value: Item) -> ThreadboundResult<()> {
        let before = self.selected;
        self.shift_insert(index, value)?;
        self.selected = selection_after_insert(before, index);
        Ok(())
    }

    /// Removes the item at `index` and fixes up the selection.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`] if `index >= count()`. An empty
    /// collection always fails; this is never a silent no-op.
    pub fn remove_at(&mut self, index: usize) -> ThreadboundResult<Item> {
        let before = self.selected;
        let len_before = self.items.len();
        let removed = self.shift_remove(index)?;
        self.selected = selection_after_remove(before, index, len_before);
        Ok(removed)
    }

    /// Verifies the selection invariant.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::CorruptedState`] if the selection disagrees with
    /// the item count.
    pub fn audit(&self) -> ThreadboundResult<()> {
        match (self.selected, self.items.len()) {
            (None, 0) => Ok(()),
            (None, count) => Err(ThreadboundError::CorruptedState(format!(
                "no selection while holding {count} items"
            ))),
            (Some(index), count) if index >= count => {
                Err(ThreadboundError::CorruptedState(format!(
                    "selection {index} out of range for {count} items"
                )))
            }
            (Some(_), _) => Ok(()),
        }
    }

    /// Shifts items right and writes `value`. Leaves the selection alone.
    pub(crate) fn shift_insert(&mut self, index: usize, value: Item) -> ThreadboundResult<()> {
        if index > self.items.len() {
            return Err(ThreadboundError::InvalidIndex {
                index,
                count: self.items.len(),
            });
        }
        self.items.insert(index, value);
        Ok(())
    }

    /// Removes the item at `index`. Leaves the selection alone.
    pub(crate) fn shift_remove(&mut self, index: usize) -> ThreadboundResult<Item> {
        if index >= self.items.len() {
            return Err(ThreadboundError::InvalidIndex {
                index,
                count: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Overwrites the selection without any validation.
    pub(crate) fn set_selected(&mut self, selected: Option<usize>) {
        self.selected = selected;
    }
}

impl ItemSequence for OrderedItemCollection {
    fn count(&self) -> usize {
        OrderedItemCollection::count(self)
    }

    fn insert_at(&mut self, index: usize, value: Item) -> ThreadboundResult<()> {
        OrderedItemCollection::insert_at(self, index, value)
    }

    fn remove_at(&mut self, index: usize) -> ThreadboundResult<Item> {
        OrderedItemCollection::remove_at(self, index)
    }

    fn audit(&self) -> ThreadboundResult<()> {
        OrderedItemCollection::audit(self)
    }
}

/// Selection after inserting at `index`.
///
/// The first item ever inserted becomes selected; inserting at or before the
/// selection moves it right so it keeps pointing at the same item.
pub(crate) fn selection_after_insert(selected: Option<usize>, index: usize) -> Option<usize> {
    match selected {
        None => Some(0),
        Some(current) if index <= current => Some(current + 1),
        Some(current) => Some(current),
    }
}

/// Selection after removing `index` from a collection of `len_before` items.
///
/// Removing the selected item selects its predecessor, or the new first item
/// when index 0 was removed.
pub(crate) fn selection_after_remove(
    selected: Option<usize>,
    index: usize,
    len_before: usize,
) -> Option<usize> {
    if len_before <= 1 {
        return None;
    }
    match selected {
        Some(current) if current == index => Some(index.saturating_sub(1)),
        Some(current) if current > index => Some(current - 1),
        other => other,
    }
}
