// tests/parallel_for.rs

mod common;
use crate::common::{TEST_DEADLINE, deadline, init_tracing};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use taskwave::ThreadManager;

/// `job_count(n)` produces the index set {0..n-1} exactly once each.
#[test]
fn fan_out_covers_every_index_exactly_once() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(4, &[]).unwrap();
        let indices = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&indices);
        manager.one_time_graph(move |wave| {
            let record = Arc::clone(&sink);
            wave.parallel_for()
                .name("fan")
                .for_each(move |index| {
                    record.lock().unwrap().push(index);
                })
                .job_count(32);
        });
        manager.run();
        manager.stop();

        let mut seen = indices.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..32).collect::<Vec<_>>());
    });
}

/// The parallel-for node completes only after every sub-job finished: a
/// dependent always observes the full index set.
#[test]
fn dependent_observes_all_sub_jobs() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(4, &[]).unwrap();
        let completed = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(AtomicUsize::new(0));

        let jobs = Arc::clone(&completed);
        let readout_handle = Arc::clone(&observed);
        let reader_handle = Arc::clone(&completed);
        manager.one_time_graph(move |wave| {
            let per_job = Arc::clone(&jobs);
            let fan = wave
                .parallel_for()
                .name("fan")
                .for_each(move |_| {
                    per_job.fetch_add(1, Ordering::SeqCst);
                })
                .job_count(16);
            let readout = Arc::clone(&readout_handle);
            let reader = Arc::clone(&reader_handle);
            wave.task().name("join").after(&fan).work(move || {
                readout.store(reader.load(Ordering::SeqCst), Ordering::SeqCst);
            });
        });
        manager.run();
        manager.stop();

        assert_eq!(observed.load(Ordering::SeqCst), 16);
    });
}

/// `job_count(0)` completes without blocking.
#[test]
fn zero_jobs_complete_without_blocking() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(2, &[]).unwrap();
        let after_ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&after_ran);
        manager.one_time_graph(move |wave| {
            let empty = wave
                .parallel_for()
                .name("empty")
                .for_each(|_| panic!("no job should run"))
                .job_count(0);
            let flag = Arc::clone(&flag);
            wave.task().name("after-empty").after(&empty).work(move || {
                flag.store(true, Ordering::SeqCst);
            });
        });
        manager.run();
        manager.stop();

        assert!(after_ran.load(Ordering::SeqCst));
    });
}

/// A parallel-for without a functor skips work but still finalizes.
#[test]
fn missing_functor_finalizes_normally() {
    init_tracing();
    deadline(TEST_DEADLINE, || {
        let manager = ThreadManager::new(2, &[]).unwrap();
        let after_ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&after_ran);
        manager.one_time_graph(move |wave| {
            let silent = wave.parallel_for().name("silent").job_count(64);
            let flag = Arc::clone(&flag);
            wave.task().name("after-silent").after(&silent).work(move || {
                flag.store(true, Ordering::SeqCst);
            });
        });
        manager.run();
        manager.stop();

        assert!(after_ran.load(Ordering::SeqCst));
    });
}
