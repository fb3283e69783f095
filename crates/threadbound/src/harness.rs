//! # Harness
//!
//! Stands in for the window with its "Good" and "Bad" buttons.
//!
//! ```text
//!   start_safe_worker()  ──> SafeWorker ──submit──> AffinityExecutor ──┐
//!                                                                      ▼
//!                                                     SharedItemCollection
//!                                                                      ▲
//!   start_unsafe_worker() ──> UnguardedWorker ──direct edits───────────┘
//! ```
//!
//! Every start spawns a NEW independent worker, exactly like pressing a
//! button twice. Reads (`count`, `item_at`, `snapshot`) go through the
//! affinity thread.

use std::time::{SystemTime, UNIX_EPOCH};

use threadbound_core::{
    AffinityExecutor, ExecutorConfig, ExecutorStats, Item, MutationDecision, MutationGenerator,
    OriginId, SharedItemCollection, TaskRecord, ThreadboundError, ThreadboundResult,
};
use tracing::info;

use crate::config::HarnessConfig;
use crate::events::{EventBus, EventReceiver};
use crate::worker::{
    SafeWorker, UnguardedWorker, WorkerHandle, WorkerKind, WorkerState, WorkerStats,
};

/// Spreads worker ids over the seed space.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Final counters for one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker id.
    pub id: OriginId,
    /// Access discipline.
    pub kind: WorkerKind,
    /// Final counters.
    pub stats: WorkerStats,
}

/// Summary produced by [`Harness::shutdown`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessReport {
    /// Item count read from the affinity thread before shutdown.
    pub final_count: usize,
    /// Executor counters after the queue drained.
    pub executor: ExecutorStats,
    /// One entry per worker stopped during shutdown.
    pub workers: Vec<WorkerReport>,
}

impl HarnessReport {
    /// Total anomalies observed by unguarded workers.
    #[must_use]
    pub fn anomalies(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.anomalies).sum()
    }
}

/// Owns the collection, the affinity executor and every worker.
pub struct Harness {
    config: HarnessConfig,
    collection: SharedItemCollection,
    executor: AffinityExecutor<SharedItemCollection>,
    events: EventBus,
    workers: Vec<WorkerHandle>,
    next_worker: u32,
    base_seed: u64,
}

impl Harness {
    /// Creates the collection with its seed item and starts the affinity
    /// thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Config`] for invalid config,
    /// [`ThreadboundError::Spawn`] if the affinity thread cannot start.
    pub fn new(config: HarnessConfig) -> ThreadboundResult<Self> {
        config.validate()?;

        let collection = SharedItemCollection::with_seed(config.seed_item);
        let executor = AffinityExecutor::spawn(
            collection.clone(),
            ExecutorConfig {
                thread_name: "affinity".to_string(),
                journal_capacity: config.journal_capacity,
            },
        )?;
        let base_seed = config.seed.unwrap_or_else(clock_seed);
        info!(base_seed, tick_ms = config.tick_ms, "harness ready");

        Ok(Self {
            events: EventBus::new(config.event_capacity),
            config,
            collection,
            executor,
            workers: Vec::new(),
            next_worker: 1,
            base_seed,
        })
    }

    /// Spawns a new worker that marshals edits onto the affinity thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Spawn`] if the thread cannot start.
    pub fn start_safe_worker(&mut self) -> ThreadboundResult<OriginId> {
        let id = self.allocate_id();
        let body = SafeWorker::new(id, self.generator_for(id), self.executor.submitter());
        self.launch(id, WorkerKind::Safe, body)
    }

    /// Spawns a new worker that edits the collection from its own thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Spawn`] if the thread cannot start.
    pub fn start_unsafe_worker(&mut self) -> ThreadboundResult<OriginId> {
        let id = self.allocate_id();
        let body = UnguardedWorker::new(
            id,
            self.generator_for(id),
            self.collection.clone(),
            self.events.sender(),
        );
        self.launch(id, WorkerKind::Unguarded, body)
    }

    /// Stops one worker and waits for it.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::UnknownWorker`] if no live worker has that id.
    pub fn stop_worker(&mut self, id: OriginId) -> ThreadboundResult<WorkerReport> {
        let position = self
            .workers
            .iter()
            .position(|w| w.id() == id)
            .ok_or(ThreadboundError::UnknownWorker(id))?;
        let handle = self.workers.swap_remove(position);
        let kind = handle.kind();
        let stats = handle.stop_and_join()?;
        Ok(WorkerReport { id, kind, stats })
    }

    /// Stops every worker: signal all first, then join all.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::CorruptedState`] if a worker thread panicked.
    pub fn stop_all(&mut self) -> ThreadboundResult<Vec<WorkerReport>> {
        for handle in &self.workers {
            handle.stop();
        }
        let mut reports = Vec::with_capacity(self.workers.len());
        for handle in self.workers.drain(..) {
            let id = handle.id();
            let kind = handle.kind();
            let stats = handle.stop_and_join()?;
            reports.push(WorkerReport { id, kind, stats });
        }
        Ok(reports)
    }

    /// Submits one edit from the harness itself, as a UI event handler would.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::ExecutorShutDown`] after shutdown.
    pub fn submit(&self, decision: MutationDecision) -> ThreadboundResult<u64> {
        self.executor.submit(OriginId::HARNESS, decision)
    }

    /// Item count, read on the affinity thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::ExecutorShutDown`] after shutdown.
    pub fn count(&self) -> ThreadboundResult<usize> {
        self.executor.invoke_and_wait(|model| model.count())
    }

    /// Item at `index`, read on the affinity thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::InvalidIndex`] or
    /// [`ThreadboundError::ExecutorShutDown`].
    pub fn item_at(&self, index: usize) -> ThreadboundResult<Item> {
        self.executor.invoke_and_wait(move |model| model.item_at(index))?
    }

    /// Selected index, read on the affinity thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::ExecutorShutDown`] after shutdown.
    pub fn selected(&self) -> ThreadboundResult<Option<usize>> {
        self.executor.invoke_and_wait(|model| model.selected())
    }

    /// Copy of the items, taken on the affinity thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::ExecutorShutDown`] after shutdown.
    pub fn snapshot(&self) -> ThreadboundResult<Vec<Item>> {
        self.executor.invoke_and_wait(|model| model.snapshot())
    }

    /// Runs the bookkeeping audit on the affinity thread.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::CorruptedState`] if the invariant is broken.
    pub fn audit(&self) -> ThreadboundResult<()> {
        self.executor.invoke_and_wait(|model| model.audit())?
    }

    /// Executor counters.
    #[must_use]
    pub fn executor_stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    /// Executed-task journal, oldest first.
    #[must_use]
    pub fn journal(&self) -> Vec<TaskRecord> {
        self.executor.journal()
    }

    /// A receiver for worker events.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.events.receiver()
    }

    /// Number of workers not yet stopped by the harness.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Lifecycle state of a worker, if the harness still holds it.
    #[must_use]
    pub fn worker_state(&self, id: OriginId) -> Option<WorkerState> {
        self.workers.iter().find(|w| w.id() == id).map(WorkerHandle::state)
    }

    /// Live counters of a worker, if the harness still holds it.
    #[must_use]
    pub fn worker_stats(&self, id: OriginId) -> Option<WorkerStats> {
        self.workers.iter().find(|w| w.id() == id).map(WorkerHandle::stats)
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Base seed the worker generators were derived from.
    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Stops all workers, reads the final count, drains and stops the
    /// affinity thread.
    ///
    /// # Errors
    ///
    /// Propagates worker join failures and executor shutdown failures.
    pub fn shutdown(mut self) -> ThreadboundResult<HarnessReport> {
        let workers = self.stop_all()?;
        let final_count = self.count()?;
        self.executor.shutdown()?;

        let report = HarnessReport {
            final_count,
            executor: self.executor.stats(),
            workers,
        };
        info!(
            final_count = report.final_count,
            executed = report.executor.executed,
            failed = report.executor.failed,
            anomalies = report.anomalies(),
            "harness shut down"
        );
        Ok(report)
    }

    fn allocate_id(&mut self) -> OriginId {
        let id = OriginId(self.next_worker);
        self.next_worker += 1;
        id
    }

    fn generator_for(&self, id: OriginId) -> MutationGenerator {
        MutationGenerator::from_seed(self.base_seed ^ u64::from(id.0).wrapping_mul(SEED_STRIDE))
    }

    fn launch<B: crate::worker::WorkerBody>(
        &mut self,
        id: OriginId,
        kind: WorkerKind,
        body: B,
    ) -> ThreadboundResult<OriginId> {
        let handle = WorkerHandle::spawn(id, kind, self.config.tick(), body, self.events.sender())?;
        info!(worker = %id, %kind, "worker launched");
        self.workers.push(handle);
        Ok(id)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        // Workers first, so none is mid-submit when the executor goes away
        for handle in &self.workers {
            handle.stop();
        }
        self.workers.clear();
    }
}

/// Seed derived from the wall clock, for runs without a configured seed.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(SEED_STRIDE)
}
