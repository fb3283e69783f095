//! # Affinity Executor
//!
//! A FIFO, single-consumer task queue bound to one long-lived thread that
//! owns the model.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────┐
//!   │ Submitter  │──┐
//!   └────────────┘  │    ┌──────────────────┐    ┌──────────────────────┐
//!   ┌────────────┐  ├───>│ unbounded FIFO   │───>│ affinity thread      │
//!   │ Submitter  │──┤    │ Task | Call |    │    │  owns M              │
//!   └────────────┘  │    │ Shutdown         │    │  one envelope at a   │
//!   ┌────────────┐  │    └──────────────────┘    │  time, to completion │
//!   │ Executor   │──┘                            └──────────────────────┘
//!   └────────────┘
//! ```
//!
//! - `submit`: fire-and-forget, never blocks, no result
//! - `invoke_and_wait`: run a closure on the affinity thread, block for its
//!   return value
//! - a failing task is logged and counted; the loop moves on

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::task::{OriginId, Task, TaskRecord};
use crate::error::{ThreadboundError, ThreadboundResult};

/// State that may only be touched from its affinity thread.
///
/// The executor moves the model into the affinity thread; every command is
/// applied there, strictly in queue order.
pub trait AffinityModel: Send + 'static {
    /// Command value carried by a task.
    type Command: Send + fmt::Debug + 'static;
    /// What a successful command reports.
    type Outcome: fmt::Debug;

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Any error means the model rejected the command. Under affinity
    /// discipline that is a defect, and the executor logs it as such.
    fn apply(&mut self, command: &Self::Command) -> ThreadboundResult<Self::Outcome>;
}

/// Configuration for the affinity executor.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Name of the affinity thread.
    pub thread_name: String,
    /// Maximum number of executed tasks kept in the journal.
    pub journal_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            thread_name: "affinity".to_string(),
            journal_capacity: 4096,
        }
    }
}

/// Counters for the affinity executor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Tasks accepted by `submit`.
    pub submitted: u64,
    /// Tasks the affinity thread has run, successful or not.
    pub executed: u64,
    /// Tasks the model rejected.
    pub failed: u64,
}

type Call<M> = Box<dyn FnOnce(&mut M) + Send>;

enum Envelope<M: AffinityModel> {
    Task(Task<M::Command>),
    Call(Call<M>),
    Shutdown,
}

/// Admission state. Held across the check and the send, so a task either
/// lands ahead of the shutdown marker or is refused, and queue order matches
/// sequence order.
struct Gate {
    accepting: bool,
    next_seq: u64,
}

/// State shared by the executor, its submitters and the affinity thread.
struct ExecutorShared {
    gate: Mutex<Gate>,
    submitted: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    journal: Mutex<VecDeque<TaskRecord>>,
    journal_capacity: usize,
}

impl ExecutorShared {
    fn new(journal_capacity: usize) -> Self {
        Self {
            gate: Mutex::new(Gate {
                accepting: true,
                next_seq: 0,
            }),
            submitted: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            journal: Mutex::new(VecDeque::with_capacity(journal_capacity.min(4096))),
            journal_capacity,
        }
    }

    fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.submitted.load(Ordering::Acquire),
            executed: self.executed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }

    /// Runs one task on the affinity thread.
    fn run_task<M: AffinityModel>(&self, model: &mut M, task: &Task<M::Command>) {
        let succeeded = match model.apply(&task.command) {
            Ok(outcome) => {
                debug!(seq = task.seq, origin = %task.origin, ?outcome, "task applied");
                true
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                error!(
                    seq = task.seq,
                    origin = %task.origin,
                    command = ?task.command,
                    error = %err,
                    "FATAL: serialized task failed on the affinity thread"
                );
                false
            }
        };
        self.record(TaskRecord {
            seq: task.seq,
            origin: task.origin,
            succeeded,
        });
        self.executed.fetch_add(1, Ordering::AcqRel);
    }

    fn record(&self, record: TaskRecord) {
        if self.journal_capacity == 0 {
            return;
        }
        let mut journal = self.journal.lock();
        if journal.len() == self.journal_capacity {
            journal.pop_front();
        }
        journal.push_back(record);
    }
}

/// Cloneable handle for sending work to the affinity thread.
///
/// This is all a worker ever gets: it can enqueue commands, it can never
/// reach the model directly.
pub struct Submitter<M: AffinityModel> {
    sender: Sender<Envelope<M>>,
    shared: Arc<ExecutorShared>,
    affinity_thread: ThreadId,
}

impl<M: AffinityModel> Clone for Submitter<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            shared: Arc::clone(&self.shared),
            affinity_thread: self.affinity_thread,
        }
    }
}

impl<M: AffinityModel> fmt::Debug for Submitter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("affinity_thread", &self.affinity_thread)
            .field("pending", &self.sender.len())
            .finish()
    }
}

impl<M: AffinityModel> Submitter<M> {
    /// Enqueues `command` and returns immediately with its sequence number.
    ///
    /// The command runs later on the affinity thread, after everything
    /// already queued. The caller never sees its outcome.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::ExecutorShutDown`] if the executor stopped
    /// accepting work.
    pub fn submit(&self, origin: OriginId, command: M::Command) -> ThreadboundResult<u64> {
        let mut gate = self.shared.gate.lock();
        if !gate.accepting {
            return Err(ThreadboundError::ExecutorShutDown);
        }
        let seq = gate.next_seq;
        // Count before sending so `executed` never overtakes `submitted`
        self.shared.submitted.fetch_add(1, Ordering::AcqRel);

        let task = Task {
            seq,
            origin,
            command,
        };
        if self.sender.send(Envelope::Task(task)).is_err() {
            self.shared.submitted.fetch_sub(1, Ordering::AcqRel);
            return Err(ThreadboundError::ExecutorShutDown);
        }
        gate.next_seq += 1;
        Ok(seq)
    }

    /// Runs `f` against the model on the affinity thread and waits for it.
    ///
    /// `f` runs after everything already queued.
    ///
    /// # Errors
    ///
    /// - [`ThreadboundError::WouldDeadlock`] when called from the affinity
    ///   thread
    /// - [`ThreadboundError::ExecutorShutDown`] if the executor stopped before
    ///   `f` ran
    pub fn invoke_and_wait<T, F>(&self, f: F) -> ThreadboundResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut M) -> T + Send + 'static,
    {
        if self.is_affinity_thread() {
            return Err(ThreadboundError::WouldDeadlock);
        }
        let (reply_tx, reply_rx) = bounded(1);
        let call: Call<M> = Box::new(move |model| {
            // The waiter may have given up; nothing to do then
            let _ = reply_tx.send(f(model));
        });
        {
            let gate = self.shared.gate.lock();
            if !gate.accepting {
                return Err(ThreadboundError::ExecutorShutDown);
            }
            self.sender
                .send(Envelope::Call(call))
                .map_err(|_| ThreadboundError::ExecutorShutDown)?;
        }
        reply_rx.recv().map_err(|_| ThreadboundError::ExecutorShutDown)
    }

    /// Returns `true` if the caller is running on the affinity thread.
    #[inline]
    #[must_use]
    pub fn is_affinity_thread(&self) -> bool {
        thread::current().id() == self.affinity_thread
    }

    /// Returns the number of envelopes waiting in the queue.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    /// Returns a snapshot of the executor counters.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        self.shared.stats()
    }
}

/// Owner of the affinity thread.
///
/// Dropping the executor shuts it down: queued tasks still run, then the
/// thread exits and is joined.
///
/// ## Usage
///
/// ```rust,ignore
/// let executor = AffinityExecutor::spawn(
///     OrderedItemCollection::with_seed(SEED_ITEM),
///     ExecutorConfig::default(),
/// )?;
///
/// let submitter = executor.submitter();
/// std::thread::spawn(move || {
///     submitter.submit(OriginId(1), MutationDecision::Insert(4))
/// });
///
/// let count = executor.invoke_and_wait(|model| model.count())?;
/// ```
pub struct AffinityExecutor<M: AffinityModel> {
    submitter: Submitter<M>,
    thread_name: String,
    handle: Option<JoinHandle<()>>,
}

impl<M: AffinityModel> AffinityExecutor<M> {
    /// Moves `model` onto a new affinity thread and starts the loop.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Spawn`] if the thread could not be created.
    pub fn spawn(model: M, config: ExecutorConfig) -> ThreadboundResult<Self> {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(ExecutorShared::new(config.journal_capacity));

        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_affinity_loop(model, &receiver, &loop_shared))
            .map_err(|e| ThreadboundError::Spawn(e.to_string()))?;

        let affinity_thread = handle.thread().id();
        info!(thread = %config.thread_name, "affinity executor started");

        Ok(Self {
            submitter: Submitter {
                sender,
                shared,
                affinity_thread,
            },
            thread_name: config.thread_name,
            handle: Some(handle),
        })
    }

    /// Returns a new submitter handle.
    #[must_use]
    pub fn submitter(&self) -> Submitter<M> {
        self.submitter.clone()
    }

    /// See [`Submitter::submit`].
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::ExecutorShutDown`] after shutdown.
    pub fn submit(&self, origin: OriginId, command: M::Command) -> ThreadboundResult<u64> {
        self.submitter.submit(origin, command)
    }

    /// See [`Submitter::invoke_and_wait`].
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::WouldDeadlock`] or
    /// [`ThreadboundError::ExecutorShutDown`].
    pub fn invoke_and_wait<T, F>(&self, f: F) -> ThreadboundResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut M) -> T + Send + 'static,
    {
        self.submitter.invoke_and_wait(f)
    }

    /// Returns `true` if the caller is running on the affinity thread.
    #[must_use]
    pub fn is_affinity_thread(&self) -> bool {
        self.submitter.is_affinity_thread()
    }

    /// Returns the affinity thread's id.
    #[must_use]
    pub fn affinity_thread(&self) -> ThreadId {
        self.submitter.affinity_thread
    }

    /// Returns a snapshot of the executor counters.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        self.submitter.stats()
    }

    /// Returns the executed-task journal, oldest first.
    #[must_use]
    pub fn journal(&self) -> Vec<TaskRecord> {
        self.submitter.shared.journal.lock().iter().copied().collect()
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops accepting work, drains the queue and joins the affinity thread.
    ///
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// - [`ThreadboundError::WouldDeadlock`] if called from the affinity thread
    /// - [`ThreadboundError::CorruptedState`] if the affinity thread panicked
    pub fn shutdown(&mut self) -> ThreadboundResult<()> {
        if self.is_affinity_thread() {
            return Err(ThreadboundError::WouldDeadlock);
        }
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        {
            let mut gate = self.submitter.shared.gate.lock();
            gate.accepting = false;
            // Everything queued ahead of the marker still runs
            let _ = self.submitter.sender.send(Envelope::Shutdown);
        }

        handle.join().map_err(|_| {
            ThreadboundError::CorruptedState(format!("affinity thread '{}' panicked", self.thread_name))
        })?;

        let stats = self.stats();
        info!(
            thread = %self.thread_name,
            executed = stats.executed,
            failed = stats.failed,
            "affinity executor stopped"
        );
        Ok(())
    }
}

impl<M: AffinityModel> Drop for AffinityExecutor<M> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!(thread = %self.thread_name, error = %err, "affinity executor shutdown failed");
        }
    }
}

/// Affinity thread main loop.
fn run_affinity_loop<M: AffinityModel>(
    mut model: M,
    receiver: &Receiver<Envelope<M>>,
    shared: &ExecutorShared,
) {
    while let Ok(envelope) = receiver.recv() {
        match envelope {
            Envelope::Task(task) => shared.run_task(&mut model, &task),
            Envelope::Call(call) => call(&mut model),
            Envelope::Shutdown => break,
        }
    }
    debug!("affinity loop exited");
}
