//! # Mutation Generator
//!
//! Seedable, side-effect free source of [`MutationDecision`]s.
//!
//! The same generator drives the safe and the unguarded workers, so the
//! distribution of edits is identical on both paths.
//!
//! ```rust,ignore
//! let state = GeneratorState::from_seed(7);
//! let (first, next) = next_decision(&state);
//! let (again, _) = next_decision(&state);
//! assert_eq!(first, again); // same state, same decision
//! ```

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::collection::Item;
use crate::mutation::MutationDecision;

/// Captured generator state.
///
/// Cheap to clone; a clone replays the exact same sequence of decisions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorState {
    rng: ChaCha8Rng,
}

impl GeneratorState {
    /// Creates a state from a 64-bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

/// Maps a signed draw to a non-negative item.
///
/// `i32::MIN` has no positive counterpart and saturates to `i32::MAX`.
#[inline]
#[must_use]
pub fn magnitude(draw: i32) -> Item {
    Item::try_from(draw.unsigned_abs()).unwrap_or(Item::MAX)
}

/// Computes the next decision without touching `state`.
///
/// Returns the decision and the advanced state.
#[must_use]
pub fn next_decision(state: &GeneratorState) -> (MutationDecision, GeneratorState) {
    let mut next = state.clone();
    let draw = i32::from_ne_bytes(next.rng.next_u32().to_ne_bytes());
    (MutationDecision::from_draw(magnitude(draw)), next)
}

/// Owning wrapper around [`next_decision`] for worker loops.
#[derive(Clone, Debug)]
pub struct MutationGenerator {
    state: GeneratorState,
}

impl MutationGenerator {
    /// Creates a generator from a 64-bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            state: GeneratorState::from_seed(seed),
        }
    }

    /// Returns the current state, e.g. to replay from this point.
    #[must_use]
    pub fn state(&self) -> &GeneratorState {
        &self.state
    }

    /// Produces the next decision and advances.
    pub fn next_decision(&mut self) -> MutationDecision {
        let (decision, next) = next_decision(&self.state);
        self.state = next;
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_state_same_decision() {
        let state = GeneratorState::from_seed(0xDEAD_BEEF);
        let (first, advanced_a) = next_decision(&state);
        let (second, advanced_b) = next_decision(&state);

        assert_eq!(first, second);
        assert_eq!(advanced_a, advanced_b);
        assert_ne!(advanced_a, state);
    }

    #[test]
    fn test_equal_seeds_replay() {
        let mut a = MutationGenerator::from_seed(42);
        let mut b = MutationGenerator::from_seed(42);
        for _ in 0..100 {
            assert_eq!(a.next_decision(), b.next_decision());
        }
    }

    #[test]
    fn test_magnitude_is_non_negative() {
        assert_eq!(magnitude(-5), 5);
        assert_eq!(magnitude(5), 5);
        assert_eq!(magnitude(0), 0);
        assert_eq!(magnitude(i32::MIN), i32::MAX);
    }

    #[test]
    fn test_roughly_even_split() {
        let mut generator = MutationGenerator::from_seed(2016);
        let draws = 10_000;
        let mut inserts = 0u32;

        for _ in 0..draws {
            let decision = generator.next_decision();
            assert!(decision.draw() >= 0);
            if decision.is_insert() {
                inserts += 1;
            }
        }

        // Within 5% of 50/50
        let ratio = f64::from(inserts) / f64::from(draws);
        assert!((0.45..=0.55).contains(&ratio), "insert ratio {ratio}");
    }
}
