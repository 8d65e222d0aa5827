mod common;

use common::{provider, registry, Behavior, Gate, ScriptedCheck};
use nimbus_core::{
    AuditSnapshot, AuditState, CheckResult, EngineConfig, ProgressReporter, ERROR_CATEGORY,
};
use nimbus_engine::{Orchestrator, OrchestratorBuilder, ProgressStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn resources(name: &str, count: usize) -> ScriptedCheck {
    ScriptedCheck::new(name, Behavior::Resources(count))
}

/// Records the order in which slots are filled
#[derive(Default)]
struct FinishOrder(Mutex<Vec<usize>>);

impl ProgressReporter for FinishOrder {
    fn run_started(&self, _total: usize) {}

    fn check_finished(&self, index: usize, _result: &CheckResult, _completed: usize, _total: usize) {
        self.0.lock().unwrap().push(index);
    }

    fn run_completed(&self, _snapshot: &AuditSnapshot) {}
}

/// Reporter whose callbacks all panic
struct PanickingReporter;

impl ProgressReporter for PanickingReporter {
    fn run_started(&self, _total: usize) {
        panic!("reporter failed at start");
    }

    fn check_finished(&self, index: usize, _result: &CheckResult, _completed: usize, _total: usize) {
        panic!("reporter failed at index {}", index);
    }

    fn run_completed(&self, _snapshot: &AuditSnapshot) {
        panic!("reporter failed at completion");
    }
}

#[test]
fn test_every_slot_filled_for_any_size() {
    for parallel in [false, true] {
        for size in [0usize, 1, 5, 17] {
            let checks = (0..size).map(|i| resources(&format!("check-{}", i), i % 3)).collect();
            let orchestrator = OrchestratorBuilder::new(registry(checks))
                .parallel(parallel)
                .build(provider());

            let snapshot = orchestrator.run_audit().unwrap();
            assert_eq!(snapshot.state, AuditState::Completed);
            assert_eq!(snapshot.total, size);
            assert_eq!(snapshot.completed, size);
            assert_eq!(snapshot.results.len(), size);
            assert!(snapshot.results.iter().all(|slot| slot.is_some()));
        }
    }
}

#[test]
fn test_order_independent_of_completion_time() {
    let size = 6;
    let checks = (0..size)
        .map(|i| {
            resources(&format!("check-{}", i), 1)
                .with_delay(Duration::from_millis(40 * (size - i) as u64))
        })
        .collect();
    let finish_order = Arc::new(FinishOrder::default());
    let orchestrator = OrchestratorBuilder::new(registry(checks))
        .config(EngineConfig {
            parallel: true,
            max_workers: size,
            check_timeout_secs: 0,
        })
        .progress(finish_order.clone())
        .build(provider());

    let snapshot = orchestrator.start_audit().unwrap().wait();

    let finished = finish_order.0.lock().unwrap().clone();
    assert_eq!(finished.len(), size);
    assert_eq!(finished.last(), Some(&0), "slowest check should finish last");

    for (i, slot) in snapshot.results.iter().enumerate() {
        let expected = orchestrator.registry().get(i).unwrap().name().to_string();
        assert_eq!(slot.as_ref().unwrap().check_name, expected);
    }
}

#[test]
fn test_single_flight() {
    let gate = Gate::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let checks = vec![
        ScriptedCheck::new("gated", Behavior::Gated(gate.clone())).with_counter(calls.clone()),
        resources("quick", 1).with_counter(calls.clone()),
    ];
    let orchestrator = OrchestratorBuilder::new(registry(checks))
        .parallel(true)
        .build(provider());

    let handle = orchestrator.start_audit().expect("first start should win");
    assert!(orchestrator.start_audit().is_none());
    assert!(orchestrator.run_audit().is_none());
    assert_eq!(orchestrator.snapshot().state, AuditState::Running);

    gate.open();
    let snapshot = handle.wait();
    assert_eq!(snapshot.state, AuditState::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // A finished run can be replaced by a new one
    let snapshot = orchestrator.start_audit().expect("restart after completion").wait();
    assert_eq!(snapshot.completed, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_concurrent_start_requests_admit_one_run() {
    let gate = Gate::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let checks =
        vec![ScriptedCheck::new("gated", Behavior::Gated(gate.clone())).with_counter(calls.clone())];
    let orchestrator = OrchestratorBuilder::new(registry(checks)).build(provider());

    let handles: Vec<_> = std::thread::scope(|s| {
        let spawned: Vec<_> = (0..8).map(|_| s.spawn(|| orchestrator.start_audit())).collect();
        spawned.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut admitted: Vec<_> = handles.into_iter().flatten().collect();
    assert_eq!(admitted.len(), 1);

    gate.open();
    admitted.pop().unwrap().wait();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_check_is_contained() {
    for parallel in [false, true] {
        let checks = vec![
            resources("check-0", 1),
            resources("check-1", 2),
            ScriptedCheck::new("check-2", Behavior::Panic("provider client exploded")),
            resources("check-3", 0),
            ScriptedCheck::new("check-4", Behavior::Note("API not enabled")),
        ];
        let orchestrator = OrchestratorBuilder::new(registry(checks))
            .parallel(parallel)
            .build(provider());

        let snapshot = orchestrator.run_audit().unwrap();
        assert_eq!(snapshot.state, AuditState::Completed);
        assert_eq!(snapshot.completed, 5);

        let results: Vec<_> = snapshot.results.iter().map(|s| s.clone().unwrap()).collect();
        assert_eq!(results[2].category, ERROR_CATEGORY);
        assert_eq!(results[2].check_name, "check-2");
        assert!(results[2].notes.contains("provider client exploded"));
        assert!(results[2].resources.is_empty());

        assert_eq!(results[0].resources.len(), 1);
        assert_eq!(results[1].resources.len(), 2);
        assert!(!results[3].is_degraded());
        assert_eq!(results[4].notes, "API not enabled");
        assert!(results.iter().enumerate().all(|(i, r)| i == 2 || r.category == "Test"));
    }
}

#[test]
fn test_stalled_check_times_out() {
    let checks = vec![
        resources("fast", 1),
        resources("stalled", 1)
            .with_category("Compute Engine VM")
            .with_delay(Duration::from_secs(5)),
    ];
    let orchestrator = OrchestratorBuilder::new(registry(checks))
        .parallel(false)
        .check_timeout(Some(Duration::from_millis(100)))
        .build(provider());

    let start = Instant::now();
    let snapshot = orchestrator.run_audit().unwrap();
    assert!(start.elapsed() < Duration::from_secs(4));

    assert_eq!(snapshot.state, AuditState::Completed);
    let stalled = snapshot.results[1].as_ref().unwrap();
    assert_eq!(stalled.category, "Compute Engine VM");
    assert_eq!(stalled.notes, "check timed out after 100ms");
    assert!(stalled.resources.is_empty());
    assert_eq!(snapshot.results[0].as_ref().unwrap().resources.len(), 1);
}

#[test]
fn test_snapshots_during_run_are_consistent() {
    let size = 12;
    let checks = (0..size)
        .map(|i| {
            resources(&format!("check-{}", i), 1)
                .with_delay(Duration::from_millis(5 + (i % 4) as u64 * 5))
        })
        .collect();
    let store = ProgressStore::new();
    let orchestrator = OrchestratorBuilder::new(registry(checks))
        .parallel(true)
        .store(store.clone())
        .build(provider());

    let handle = orchestrator.start_audit().unwrap();
    let mut last_completed = 0;
    while !handle.is_finished() {
        let snapshot = store.snapshot();
        let filled = snapshot.results.iter().flatten().count();
        assert!(snapshot.completed <= filled);
        assert!(snapshot.completed >= last_completed);
        last_completed = snapshot.completed;
        std::thread::sleep(Duration::from_millis(1));
    }

    let snapshot = handle.wait();
    assert_eq!(snapshot.completed, size);
    assert_eq!(store.snapshot(), snapshot);
}

#[test]
fn test_shared_orchestrator_clone_sees_same_run() {
    let gate = Gate::new();
    let checks = vec![ScriptedCheck::new("gated", Behavior::Gated(gate.clone()))];
    let orchestrator = Orchestrator::new(Arc::new(registry(checks)), provider());
    let observer = orchestrator.clone();

    let handle = orchestrator.start_audit().unwrap();
    assert!(observer.start_audit().is_none());
    assert_eq!(observer.snapshot().total, 1);

    gate.open();
    handle.wait();
    assert_eq!(observer.snapshot().state, AuditState::Completed);
}

#[test]
fn test_panicking_reporter_does_not_stall_audit() {
    for parallel in [false, true] {
        for timeout in [None, Some(Duration::from_secs(5))] {
            let checks = (0..3).map(|i| resources(&format!("check-{}", i), 1)).collect();
            let orchestrator = OrchestratorBuilder::new(registry(checks))
                .parallel(parallel)
                .check_timeout(timeout)
                .progress(Arc::new(PanickingReporter))
                .build(provider());

            let snapshot = orchestrator.start_audit().unwrap().wait();
            assert_eq!(snapshot.state, AuditState::Completed, "parallel={}", parallel);
            assert_eq!(snapshot.completed, 3);
            assert!(snapshot
                .filled_results()
                .iter()
                .all(|result| result.resources.len() == 1));

            let rerun = orchestrator.run_audit();
            assert!(rerun.is_some(), "next audit should be admitted");
        }
    }
}
