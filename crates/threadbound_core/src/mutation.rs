//! # Mutation Decisions
//!
//! The command value carried by every affinity task and applied verbatim by
//! the unguarded workers. Both paths share [`apply_decision`], so the only
//! experimental variable is *who* calls it.

use crate::collection::{Item, ItemSequence, OrderedItemCollection, SharedItemCollection};
use crate::error::ThreadboundResult;
use crate::sync::AffinityModel;

/// Which edit to make, derived from one non-negative random draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationDecision {
    /// Insert the value at index 0.
    Insert(Item),
    /// Remove the item at `draw % count()`, or do nothing if empty.
    ///
    /// The modulo is taken against the count observed when the decision is
    /// applied, not when it was drawn.
    Remove(Item),
}

impl MutationDecision {
    /// Even draws insert, odd draws remove.
    #[inline]
    #[must_use]
    pub fn from_draw(draw: Item) -> Self {
        if draw % 2 == 0 {
            Self::Insert(draw)
        } else {
            Self::Remove(draw)
        }
    }

    /// Returns `true` for [`MutationDecision::Insert`].
    #[inline]
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert(_))
    }

    /// Returns the draw this decision was built from.
    #[inline]
    #[must_use]
    pub fn draw(&self) -> Item {
        match *self {
            Self::Insert(draw) | Self::Remove(draw) => draw,
        }
    }

    /// Resolves the removal index against `count`.
    ///
    /// Returns `None` for inserts and for removals on an empty collection.
    #[must_use]
    pub fn removal_index(&self, count: usize) -> Option<usize> {
        match *self {
            Self::Remove(draw) if count > 0 => Some(draw.unsigned_abs() as usize % count),
            _ => None,
        }
    }
}

/// What applying a decision actually did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppliedMutation {
    /// `value` was inserted at index 0.
    Inserted {
        /// The inserted value.
        value: Item,
    },
    /// `value` was removed from `index`.
    Removed {
        /// Resolved index.
        index: usize,
        /// The removed value.
        value: Item,
    },
    /// A removal found the collection empty.
    Skipped,
}

/// Applies `decision`: read the count, check it, mutate.
///
/// The read-check-mutate triple is NOT atomic. It is only correct when no
/// other thread mutates `sequence` concurrently.
///
/// # Errors
///
/// Whatever the sequence reports: an index race surfaces as
/// [`ThreadboundError::InvalidIndex`](crate::ThreadboundError::InvalidIndex).
pub fn apply_decision<S: ItemSequence + ?Sized>(
    sequence: &mut S,
    decision: MutationDecision,
) -> ThreadboundResult<AppliedMutation> {
    match decision {
        MutationDecision::Insert(value) => {
            sequence.insert_at(0, value)?;
            Ok(AppliedMutation::Inserted { value })
        }
        MutationDecision::Remove(_) => {
            let Some(index) = decision.removal_index(sequence.count()) else {
                return Ok(AppliedMutation::Skipped);
            };
            let value = sequence.remove_at(index)?;
            Ok(AppliedMutation::Removed { index, value })
        }
    }
}

/// Applies `decision`, then audits the bookkeeping.
fn apply_and_audit<S: ItemSequence>(
    sequence: &mut S,
    decision: MutationDecision,
) -> ThreadboundResult<AppliedMutation> {
    let applied = apply_decision(sequence, decision)?;
    sequence.audit()?;
    Ok(applied)
}

impl AffinityModel for OrderedItemCollection {
    type Command = MutationDecision;
    type Outcome = AppliedMutation;

    fn apply(&mut self, command: &MutationDecision) -> ThreadboundResult<AppliedMutation> {
        apply_and_audit(self, *command)
    }
}

impl AffinityModel for SharedItemCollection {
    type Command = MutationDecision;
    type Outcome = AppliedMutation;

    fn apply(&mut self, command: &MutationDecision) -> ThreadboundResult<AppliedMutation> {
        apply_and_audit(self, *command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ThreadboundError, SEED_ITEM};

    #[test]
    fn test_parity_picks_the_edit() {
        assert_eq!(MutationDecision::from_draw(4), MutationDecision::Insert(4));
        assert_eq!(MutationDecision::from_draw(7), MutationDecision::Remove(7));
        assert_eq!(MutationDecision::from_draw(0), MutationDecision::Insert(0));
    }

    #[test]
    fn test_removal_index_is_modulo_count() {
        let decision = MutationDecision::Remove(7);
        assert_eq!(decision.removal_index(3), Some(1));
        assert_eq!(decision.removal_index(0), None);
        assert_eq!(MutationDecision::Insert(8).removal_index(3), None);
    }

    #[test]
    fn test_insert_then_remove_empties_seeded_collection() {
        let mut collection = OrderedItemCollection::with_seed(SEED_ITEM);

        let inserted = apply_decision(&mut collection, MutationDecision::Insert(4)).unwrap();
        assert_eq!(inserted, AppliedMutation::Inserted { value: 4 });

        let removed = apply_decision(&mut collection, MutationDecision::Remove(1)).unwrap();
        assert_eq!(removed, AppliedMutation::Removed { index: 1, value: SEED_ITEM });

        let removed = apply_decision(&mut collection, MutationDecision::Remove(1)).unwrap();
        assert_eq!(removed, AppliedMutation::Removed { index: 0, value: 4 });
        assert_eq!(collection.count(), 0);
    }

    #[test]
    fn test_remove_on_empty_is_skipped_not_failed() {
        let mut collection = OrderedItemCollection::new();
        let applied = apply_decision(&mut collection, MutationDecision::Remove(3)).unwrap();
        assert_eq!(applied, AppliedMutation::Skipped);
    }

    #[test]
    fn test_model_apply_audits() {
        let mut collection = OrderedItemCollection::with_seed(SEED_ITEM);
        collection.set_selected(Some(9));

        let err = collection.apply(&MutationDecision::Insert(2)).unwrap_err();
        assert!(matches!(err, ThreadboundError::CorruptedState(_)));
    }
}
