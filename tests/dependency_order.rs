// tests/dependency_order.rs

mod common;
use crate::common::{ExecutionRecorder, TEST_DEADLINE, deadline, init_tracing};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use taskwave::ThreadManager;

/// Spec scenario: A with no deps, B and C both after A, on a two-worker
/// pool. A must come first; B and C may interleave either way.
#[test]
fn predecessor_runs_before_both_dependents() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(2, &[]).unwrap();
        let recorder = ExecutionRecorder::new();

        let rec = recorder.clone();
        manager.one_time_graph(move |wave| {
            let (ra, rb, rc) = (rec.clone(), rec.clone(), rec.clone());
            let a = wave.task().name("A").work(move || ra.mark("A"));
            wave.task().name("B").after(&a).work(move || rb.mark("B"));
            wave.task().name("C").after(&a).work(move || rc.mark("C"));
        });
        manager.run();
        manager.stop();

        assert_eq!(recorder.snapshot().len(), 3);
        recorder.assert_order("A", "B");
        recorder.assert_order("A", "C");
    });
}

/// A's completion must happen-before B starts: B observes the counter A
/// incremented, never zero.
#[test]
fn completion_happens_before_dependent_starts() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(4, &[]).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let saw_zero = Arc::new(AtomicBool::new(false));

        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            let saw_zero = Arc::clone(&saw_zero);
            manager.one_time_graph(move |wave| {
                let inc = Arc::clone(&counter);
                let read = Arc::clone(&counter);
                let a = wave.task().name("A").work(move || {
                    inc.fetch_add(1, Ordering::SeqCst);
                });
                wave.task().name("B").after(&a).work(move || {
                    if read.load(Ordering::SeqCst) == 0 {
                        saw_zero.store(true, Ordering::SeqCst);
                    }
                    read.store(0, Ordering::SeqCst);
                });
            });
            manager.run();
        }
        manager.stop();

        assert!(!saw_zero.load(Ordering::SeqCst));
    });
}

/// At-most-once enqueue: a sink with K predecessors completing concurrently
/// runs exactly once.
#[test]
fn sink_with_many_predecessors_runs_exactly_once() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(4, &[]).unwrap();
        let executions = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&executions);
        manager.one_time_graph(move |wave| {
            let sink_counter = Arc::clone(&counter);
            let mut sink = wave.task().name("sink").work(move || {
                sink_counter.fetch_add(1, Ordering::SeqCst);
            });
            for n in 0..8 {
                let pred = wave.task().name(format!("pred-{n}")).work(|| {});
                sink = sink.after(&pred);
            }
        });
        manager.run();
        manager.stop();

        assert_eq!(executions.load(Ordering::SeqCst), 1);
    });
}

/// Chains keep their order across several frames of the same manager.
#[test]
fn chained_dependencies_run_in_declaration_order() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(2, &[]).unwrap();
        let recorder = ExecutionRecorder::new();

        let rec = recorder.clone();
        manager.one_time_graph(move |wave| {
            let (r1, r2, r3) = (rec.clone(), rec.clone(), rec.clone());
            let first = wave.task().name("first").work(move || r1.mark("first"));
            let second = wave
                .task()
                .name("second")
                .after(&first)
                .work(move || r2.mark("second"));
            wave.task()
                .name("third")
                .after(&second)
                .work(move || r3.mark("third"));
        });
        manager.run();
        manager.stop();

        assert_eq!(
            recorder.snapshot(),
            vec!["first".to_string(), "second".to_string(), "third".to_string()]
        );
    });
}

/// Nodes pinned to a dedicated lane run on that lane's thread; main-thread
/// nodes run on the thread that called `run()`.
#[test]
fn affinity_routes_nodes_to_their_lanes() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(2, &["render"]).unwrap();
        let recorder = ExecutionRecorder::new();
        let pump_thread = std::thread::current().id();
        let main_matches = Arc::new(AtomicBool::new(false));

        let rec = recorder.clone();
        let main_flag = Arc::clone(&main_matches);
        manager.one_time_graph(move |wave| {
            let rec_render = rec.clone();
            wave.task().name("on-render").lane("Render").work(move || {
                let name = std::thread::current()
                    .name()
                    .unwrap_or_default()
                    .to_string();
                rec_render.mark(format!("render:{name}"));
            });
            let flag = Arc::clone(&main_flag);
            wave.task().name("on-main").main_thread().work(move || {
                flag.store(
                    std::thread::current().id() == pump_thread,
                    Ordering::SeqCst,
                );
            });
        });

        manager.run();
        manager.stop();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(
            snapshot[0].starts_with("render:taskwave-render"),
            "unexpected worker thread: {snapshot:?}"
        );
        assert!(main_matches.load(Ordering::SeqCst));
    });
}
