//! Cooperative cancellation for worker loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ThreadboundError, ThreadboundResult};

/// Shared stop flag checked by a worker between iterations.
///
/// Cancellation never interrupts an iteration in progress; the loop notices
/// at its next checkpoint.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns [`ThreadboundError::Interrupted`] once cancelled.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Interrupted`] if cancellation was requested.
    #[inline]
    pub fn checkpoint(&self) -> ThreadboundResult<()> {
        if self.is_cancelled() {
            Err(ThreadboundError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(observer.checkpoint().is_ok());

        token.cancel();
        assert!(observer.is_cancelled());
        assert_eq!(observer.checkpoint(), Err(ThreadboundError::Interrupted));
    }
}
