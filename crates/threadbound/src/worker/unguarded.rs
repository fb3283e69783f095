//! # Unguarded Worker
//!
//! The negative control. Applies each decision straight to the shared
//! collection from the worker's own thread, racing the affinity thread and
//! any other unguarded worker.
//!
//! Index races and corrupted bookkeeping are the documented outcome, not a
//! bug: they are logged, counted and published, and the loop keeps going so
//! the hazard can be watched for as long as the demo runs.

use threadbound_core::{
    apply_decision, MutationGenerator, OriginId, SharedItemCollection, ThreadboundResult,
};
use tracing::warn;

use super::{WorkerBody, WorkerCounters};
use crate::events::{EventSender, HarnessEvent};

/// Edits the shared collection directly, bypassing the affinity executor.
pub struct UnguardedWorker {
    origin: OriginId,
    generator: MutationGenerator,
    collection: SharedItemCollection,
    events: EventSender,
}

impl UnguardedWorker {
    /// Creates an unguarded worker over its own handle to `collection`.
    #[must_use]
    pub fn new(
        origin: OriginId,
        generator: MutationGenerator,
        collection: SharedItemCollection,
        events: EventSender,
    ) -> Self {
        Self {
            origin,
            generator,
            collection,
            events,
        }
    }
}

impl WorkerBody for UnguardedWorker {
    fn run_once(&mut self, counters: &WorkerCounters) -> ThreadboundResult<()> {
        let decision = self.generator.next_decision();

        let outcome = apply_decision(&mut self.collection, decision)
            .and_then(|applied| self.collection.audit().map(|()| applied));

        match outcome {
            Ok(_) => {
                counters.record_mutation();
                Ok(())
            }
            Err(err) if err.is_hazard() => {
                counters.record_anomaly();
                warn!(
                    worker = %self.origin,
                    ?decision,
                    error = %err,
                    "unguarded access produced an anomaly"
                );
                self.events.send(HarnessEvent::Anomaly {
                    worker: self.origin,
                    error: err,
                });
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
