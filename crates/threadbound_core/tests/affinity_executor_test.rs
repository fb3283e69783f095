//! Integration tests for the affinity executor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use threadbound_core::{
    apply_decision, AffinityExecutor, AffinityModel, ExecutorConfig, MutationDecision,
    MutationGenerator, OrderedItemCollection, OriginId, ThreadboundError, ThreadboundResult,
    SEED_ITEM,
};

/// Records which thread ran each task and whether two ever overlapped.
#[derive(Default)]
struct Recorder {
    running: Arc<AtomicUsize>,
    max_running: usize,
    seen: Vec<(OriginId, u64, thread::ThreadId)>,
}

impl AffinityModel for Recorder {
    type Command = (OriginId, u64);
    type Outcome = ();

    fn apply(&mut self, command: &(OriginId, u64)) -> ThreadboundResult<()> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running = self.max_running.max(now);
        self.seen.push((command.0, command.1, thread::current().id()));
        thread::yield_now();
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_per_origin_order_on_single_thread() {
    const SUBMITTERS: u32 = 8;
    const PER_SUBMITTER: u64 = 2_000;

    let executor = AffinityExecutor::spawn(Recorder::default(), ExecutorConfig::default()).unwrap();

    let threads: Vec<_> = (1..=SUBMITTERS)
        .map(|n| {
            let submitter = executor.submitter();
            thread::spawn(move || {
                for i in 0..PER_SUBMITTER {
                    submitter.submit(OriginId(n), (OriginId(n), i)).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let affinity = executor.affinity_thread();
    let (max_running, seen) = executor
        .invoke_and_wait(|model| (model.max_running, std::mem::take(&mut model.seen)))
        .unwrap();

    assert_eq!(max_running, 1, "two tasks overlapped");
    assert_eq!(seen.len() as u64, u64::from(SUBMITTERS) * PER_SUBMITTER);

    let mut next: HashMap<OriginId, u64> = HashMap::new();
    for (origin, i, thread_id) in seen {
        assert_eq!(thread_id, affinity);
        let expected = next.entry(origin).or_insert(0);
        assert_eq!(i, *expected, "{origin} ran out of order");
        *expected += 1;
    }
    assert_eq!(executor.stats().failed, 0);
}

#[test]
fn test_journal_replays_to_same_collection() {
    const SUBMITTERS: u32 = 4;
    const PER_SUBMITTER: usize = 500;

    let executor = AffinityExecutor::spawn(
        OrderedItemCollection::with_seed(SEED_ITEM),
        ExecutorConfig {
            journal_capacity: SUBMITTERS as usize * PER_SUBMITTER,
            ..ExecutorConfig::default()
        },
    )
    .unwrap();

    let threads: Vec<_> = (1..=SUBMITTERS)
        .map(|n| {
            let submitter = executor.submitter();
            thread::spawn(move || {
                let mut generator = MutationGenerator::from_seed(u64::from(n));
                (0..PER_SUBMITTER)
                    .map(|_| {
                        let decision = generator.next_decision();
                        let seq = submitter.submit(OriginId(n), decision).unwrap();
                        (seq, decision)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let decisions: HashMap<u64, MutationDecision> = threads
        .into_iter()
        .flat_map(|t| t.join().unwrap())
        .collect();

    let live = executor.invoke_and_wait(|model| model.clone()).unwrap();
    let journal = executor.journal();
    assert_eq!(journal.len(), decisions.len());
    assert!(journal.iter().all(|record| record.succeeded));

    // Same decisions, same order, one thread: same result
    let mut replay = OrderedItemCollection::with_seed(SEED_ITEM);
    for record in &journal {
        apply_decision(&mut replay, decisions[&record.seq]).unwrap();
    }
    assert_eq!(replay, live);
    assert!(live.audit().is_ok());
}

#[test]
fn test_insert_remove_scenario() {
    let mut executor = AffinityExecutor::spawn(
        OrderedItemCollection::with_seed(SEED_ITEM),
        ExecutorConfig::default(),
    )
    .unwrap();

    executor.submit(OriginId::HARNESS, MutationDecision::Insert(4)).unwrap();
    executor.submit(OriginId::HARNESS, MutationDecision::Remove(0)).unwrap();
    executor.submit(OriginId::HARNESS, MutationDecision::Remove(0)).unwrap();

    let count = executor.invoke_and_wait(|model| model.count()).unwrap();
    assert_eq!(count, 0);

    let err = executor
        .invoke_and_wait(|model| model.remove_at(0))
        .unwrap()
        .unwrap_err();
    assert_eq!(err, ThreadboundError::InvalidIndex { index: 0, count: 0 });

    executor.shutdown().unwrap();
    assert_eq!(executor.stats().failed, 0);
    assert_eq!(
        executor.submit(OriginId::HARNESS, MutationDecision::Insert(2)),
        Err(ThreadboundError::ExecutorShutDown)
    );
}
