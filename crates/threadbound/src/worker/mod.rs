//! # Worker Threads
//!
//! Background loops that keep editing the shared collection until told to
//! stop.
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──thread starts──> Running ──stop()──> Cancelling ──loop exits──> Stopped
//!     │                                              ▲
//!     └───────────── stop() before start ────────────┘
//! ```
//!
//! Every iteration: checkpoint the token, do one edit, sleep one tick. A
//! stop request is therefore honored within one tick plus whatever edit is
//! in flight; an edit is never interrupted halfway.

mod safe;
mod unguarded;

pub use safe::SafeWorker;
pub use unguarded::UnguardedWorker;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use threadbound_core::{CancellationToken, OriginId, ThreadboundError, ThreadboundResult};
use tracing::{debug, error, info};

use crate::events::{EventSender, HarnessEvent};

/// Which access discipline a worker follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Submits every edit to the affinity executor.
    Safe,
    /// Edits the shared collection directly from its own thread.
    Unguarded,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => f.write_str("safe"),
            Self::Unguarded => f.write_str("unguarded"),
        }
    }
}

/// Worker lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Created, thread not yet looping.
    Idle = 0,
    /// Looping.
    Running = 1,
    /// Stop requested, finishing the current iteration.
    Cancelling = 2,
    /// Loop exited.
    Stopped = 3,
}

impl From<u8> for WorkerState {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Cancelling,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free cell holding a [`WorkerState`].
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    fn load(&self) -> WorkerState {
        WorkerState::from(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves `from -> to`; returns `false` if the cell held something else.
    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Live counters, updated by the worker thread.
#[derive(Debug, Default)]
pub(crate) struct WorkerCounters {
    iterations: AtomicU64,
    mutations: AtomicU64,
    anomalies: AtomicU64,
}

impl WorkerCounters {
    pub(crate) fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            iterations: self.iterations.load(Ordering::Acquire),
            mutations: self.mutations.load(Ordering::Acquire),
            anomalies: self.anomalies.load(Ordering::Acquire),
        }
    }
}

/// Counters for one worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Completed loop iterations.
    pub iterations: u64,
    /// Edits submitted (safe) or applied (unguarded).
    pub mutations: u64,
    /// Hazard anomalies observed (unguarded only).
    pub anomalies: u64,
}

/// One unit of worker work.
pub(crate) trait WorkerBody: Send + 'static {
    /// Performs a single edit.
    ///
    /// Hazard anomalies the body tolerates are recorded in `counters`;
    /// returning an error ends the loop.
    fn run_once(&mut self, counters: &WorkerCounters) -> ThreadboundResult<()>;
}

/// Handle to a running worker thread.
///
/// Dropping the handle stops and joins the worker.
pub struct WorkerHandle {
    id: OriginId,
    kind: WorkerKind,
    token: CancellationToken,
    state: Arc<StateCell>,
    counters: Arc<WorkerCounters>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawns a worker thread running `body` every `tick`.
    pub(crate) fn spawn<B: WorkerBody>(
        id: OriginId,
        kind: WorkerKind,
        tick: Duration,
        body: B,
        events: EventSender,
    ) -> ThreadboundResult<Self> {
        let token = CancellationToken::new();
        let state = Arc::new(StateCell::new());
        let counters = Arc::new(WorkerCounters::default());

        let thread_token = token.clone();
        let thread_state = Arc::clone(&state);
        let thread_counters = Arc::clone(&counters);

        let thread = thread::Builder::new()
            .name(format!("{kind}-worker-{}", id.0))
            .spawn(move || {
                run_worker(
                    id,
                    kind,
                    tick,
                    body,
                    &thread_token,
                    &thread_state,
                    &thread_counters,
                    &events,
                );
            })
            .map_err(|e| ThreadboundError::Spawn(e.to_string()))?;

        Ok(Self {
            id,
            kind,
            token,
            state,
            counters,
            thread: Some(thread),
        })
    }

    /// Returns the worker id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> OriginId {
        self.id
    }

    /// Returns the worker's access discipline.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state.load()
    }

    /// Returns a snapshot of the worker counters.
    #[must_use]
    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Requests a stop. Returns immediately; the loop exits within one tick.
    pub fn stop(&self) {
        if !self.state.transition(WorkerState::Running, WorkerState::Cancelling) {
            self.state.transition(WorkerState::Idle, WorkerState::Cancelling);
        }
        self.token.cancel();
    }

    /// Stops the worker and waits for its thread to exit.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::CorruptedState`] if the worker thread panicked.
    pub fn stop_and_join(mut self) -> ThreadboundResult<WorkerStats> {
        self.stop();
        self.join_thread()?;
        Ok(self.stats())
    }

    fn join_thread(&mut self) -> ThreadboundResult<()> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                ThreadboundError::CorruptedState(format!("{} worker {} panicked", self.kind, self.id))
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
        if let Err(err) = self.join_thread() {
            error!(worker = %self.id, error = %err, "worker join failed");
        }
    }
}

/// Worker thread main function.
#[allow(clippy::too_many_arguments)]
fn run_worker<B: WorkerBody>(
    id: OriginId,
    kind: WorkerKind,
    tick: Duration,
    mut body: B,
    token: &CancellationToken,
    state: &StateCell,
    counters: &WorkerCounters,
    events: &EventSender,
) {
    // stop() may already have won the race against thread start-up
    if state.transition(WorkerState::Idle, WorkerState::Running) {
        info!(worker = %id, %kind, "worker started");
        events.send(HarnessEvent::WorkerStarted { worker: id, kind });

        match run_loop(&mut body, token, tick, counters) {
            Err(ThreadboundError::Interrupted) => debug!(worker = %id, "worker interrupted"),
            Err(err) => error!(worker = %id, %kind, error = %err, "worker loop aborted"),
            Ok(()) => {}
        }
    }

    state.store(WorkerState::Stopped);
    let stats = counters.snapshot();
    info!(
        worker = %id,
        %kind,
        iterations = stats.iterations,
        anomalies = stats.anomalies,
        "worker stopped"
    );
    events.send(HarnessEvent::WorkerStopped {
        worker: id,
        kind,
        stats,
    });
}

/// Iterates until the token is cancelled or the body fails.
fn run_loop<B: WorkerBody>(
    body: &mut B,
    token: &CancellationToken,
    tick: Duration,
    counters: &WorkerCounters,
) -> ThreadboundResult<()> {
    loop {
        token.checkpoint()?;
        body.run_once(counters)?;
        counters.iterations.fetch_add(1, Ordering::Relaxed);
        thread::sleep(tick);
    }
}
