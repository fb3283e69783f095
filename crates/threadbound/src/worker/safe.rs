//! Safe worker: draws a decision, submits it, never touches the model.

use threadbound_core::{
    AffinityModel, MutationDecision, MutationGenerator, OriginId, Submitter, ThreadboundResult,
};

use super::{WorkerBody, WorkerCounters};

/// Marshals every edit onto the affinity thread.
///
/// The count check inside each edit is deferred until the task actually
/// runs on the affinity thread, so it always sees a consistent collection.
pub struct SafeWorker<M: AffinityModel<Command = MutationDecision>> {
    origin: OriginId,
    generator: MutationGenerator,
    submitter: Submitter<M>,
}

impl<M: AffinityModel<Command = MutationDecision>> SafeWorker<M> {
    /// Creates a safe worker submitting through `submitter`.
    #[must_use]
    pub fn new(origin: OriginId, generator: MutationGenerator, submitter: Submitter<M>) -> Self {
        Self {
            origin,
            generator,
            submitter,
        }
    }
}

impl<M: AffinityModel<Command = MutationDecision>> WorkerBody for SafeWorker<M> {
    fn run_once(&mut self, counters: &WorkerCounters) -> ThreadboundResult<()> {
        let decision = self.generator.next_decision();
        // Fire and forget; an executor shutdown ends the loop
        self.submitter.submit(self.origin, decision)?;
        counters.record_mutation();
        Ok(())
    }
}
