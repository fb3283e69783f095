//! Integration tests for the harness: safe workers, unguarded workers,
//! cancellation.

use std::thread;
use std::time::{Duration, Instant};

use threadbound::{Harness, HarnessConfig, HarnessEvent, WorkerKind, WorkerState};
use threadbound_core::{MutationDecision, OriginId, ThreadboundError};

fn config(tick_ms: u64, seed: u64) -> HarnessConfig {
    HarnessConfig {
        tick_ms,
        seed: Some(seed),
        ..HarnessConfig::default()
    }
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_safe_workers_never_fail() {
    let mut harness = Harness::new(config(1, 11)).unwrap();
    let ids: Vec<OriginId> = (0..4).map(|_| harness.start_safe_worker().unwrap()).collect();

    for _ in 0..20 {
        thread::sleep(Duration::from_millis(5));
        harness.audit().unwrap();
    }

    let report = harness.shutdown().unwrap();
    assert_eq!(report.workers.len(), ids.len());
    assert_eq!(report.executor.failed, 0);
    assert_eq!(report.executor.submitted, report.executor.executed);
    assert_eq!(report.anomalies(), 0);
    assert!(report.workers.iter().all(|w| w.kind == WorkerKind::Safe));
    assert!(report.workers.iter().all(|w| w.stats.mutations > 0));
}

#[test]
fn test_reads_agree_once_workers_stop() {
    let mut harness = Harness::new(config(1, 3)).unwrap();
    harness.start_safe_worker().unwrap();
    harness.start_safe_worker().unwrap();
    thread::sleep(Duration::from_millis(30));

    harness.stop_all().unwrap();
    let snapshot = harness.snapshot().unwrap();
    assert_eq!(harness.count().unwrap(), snapshot.len());
    assert!(harness.journal().iter().all(|record| record.succeeded));

    let report = harness.shutdown().unwrap();
    assert_eq!(report.final_count, snapshot.len());
    assert!(report.workers.is_empty());
}

#[test]
fn test_unguarded_workers_surface_hazards() {
    const TRIALS: u64 = 10;

    let mut anomalies = 0;
    for trial in 0..TRIALS {
        let mut harness = Harness::new(config(1, trial)).unwrap();
        let events = harness.events();
        harness.start_unsafe_worker().unwrap();
        harness.start_unsafe_worker().unwrap();
        harness.start_safe_worker().unwrap();
        thread::sleep(Duration::from_millis(200));

        let report = harness.shutdown().unwrap();
        anomalies = report.anomalies();

        if anomalies > 0 {
            let published = events
                .drain()
                .into_iter()
                .filter_map(|event| match event {
                    HarnessEvent::Anomaly { error, .. } => Some(error),
                    _ => None,
                })
                .collect::<Vec<_>>();
            assert!(!published.is_empty());
            assert!(published.iter().all(ThreadboundError::is_hazard));
            break;
        }
    }
    assert!(anomalies > 0, "no hazard observed in {TRIALS} trials");
}

#[test]
fn test_single_unguarded_worker_races_affinity_thread() {
    const TRIALS: u64 = 10;

    for trial in 0..TRIALS {
        let mut harness = Harness::new(config(1, 100 + trial)).unwrap();
        harness.start_unsafe_worker().unwrap();
        harness.start_safe_worker().unwrap();
        thread::sleep(Duration::from_millis(200));

        let report = harness.shutdown().unwrap();
        // Either side may be the one that trips over the other
        if report.anomalies() > 0 || report.executor.failed > 0 {
            return;
        }
    }
    panic!("no hazard observed in {TRIALS} trials");
}

#[test]
fn test_stop_is_honored_within_a_tick() {
    let mut harness = Harness::new(config(1, 5)).unwrap();
    let id = harness.start_unsafe_worker().unwrap();
    wait_until("worker to run", || {
        harness.worker_state(id) == Some(WorkerState::Running)
    });

    let started = Instant::now();
    let report = harness.stop_worker(id).unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(report.id, id);
    assert_eq!(harness.worker_state(id), None);

    // Nothing edits the collection once the worker is gone
    let before = harness.snapshot().unwrap();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(harness.snapshot().unwrap(), before);
}

#[test]
fn test_each_start_spawns_an_independent_worker() {
    let mut harness = Harness::new(config(1, 9)).unwrap();
    let first = harness.start_safe_worker().unwrap();
    let second = harness.start_safe_worker().unwrap();
    assert_ne!(first, second);
    assert_eq!(harness.worker_count(), 2);

    harness.stop_worker(first).unwrap();
    assert_eq!(harness.worker_count(), 1);
    wait_until("second worker to keep editing", || {
        harness.worker_stats(second).is_some_and(|s| s.mutations > 2)
    });

    assert!(matches!(
        harness.stop_worker(first),
        Err(ThreadboundError::UnknownWorker(id)) if id == first
    ));
    harness.shutdown().unwrap();
}

#[test]
fn test_harness_submit_and_reads() {
    let harness = Harness::new(config(1, 1)).unwrap();
    harness.submit(MutationDecision::Insert(4)).unwrap();

    assert_eq!(harness.count().unwrap(), 2);
    assert_eq!(harness.item_at(0).unwrap(), 4);
    assert_eq!(harness.selected().unwrap(), Some(1));
    assert!(matches!(
        harness.item_at(9),
        Err(ThreadboundError::InvalidIndex { index: 9, count: 2 })
    ));

    let journal = harness.journal();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].origin, OriginId::HARNESS);

    let report = harness.shutdown().unwrap();
    assert_eq!(report.final_count, 2);
    assert!(report.workers.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let bad = HarnessConfig {
        event_capacity: 0,
        ..HarnessConfig::default()
    };
    assert!(matches!(Harness::new(bad), Err(ThreadboundError::Config(_))));

    let busy_loop = HarnessConfig {
        tick_ms: 0,
        ..HarnessConfig::default()
    };
    assert!(matches!(Harness::new(busy_loop), Err(ThreadboundError::Config(_))));
}
