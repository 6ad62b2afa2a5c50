// tests/property_ordering.rs

//! Property test: any acyclic dependency wiring executes in an order that
//! respects every declared edge.

mod common;
use crate::common::{ExecutionRecorder, TEST_DEADLINE, deadline, init_tracing};

use proptest::prelude::*;

use taskwave::ThreadManager;

/// Strategy for a random DAG over `max_tasks` nodes.
///
/// Acyclicity is guaranteed by construction: node `i` may only depend on
/// nodes with an index below `i`.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut deps: Vec<usize> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect();
                    deps.sort_unstable();
                    deps.dedup();
                    deps
                })
                .collect()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_dags_respect_every_declared_edge(deps in dag_strategy(10)) {
        init_tracing();
        let outcome = deadline(TEST_DEADLINE, move || {
            let manager = ThreadManager::new(3, &[]).unwrap();
            let recorder = ExecutionRecorder::new();

            let rec = recorder.clone();
            let wiring = deps.clone();
            manager.one_time_graph(move |wave| {
                let mut handles = Vec::new();
                for (i, node_deps) in wiring.iter().enumerate() {
                    let rec = rec.clone();
                    let mut handle = wave
                        .task()
                        .name(format!("node-{i}"))
                        .work(move || rec.mark(format!("node-{i}")));
                    for dep in node_deps {
                        handle = handle.after(&handles[*dep]);
                    }
                    handles.push(handle);
                }
            });
            manager.run();
            manager.stop();
            (recorder, deps)
        });

        let (recorder, deps) = outcome;
        let snapshot = recorder.snapshot();
        prop_assert_eq!(snapshot.len(), deps.len());

        for (i, node_deps) in deps.iter().enumerate() {
            for dep in node_deps {
                let before = recorder.index_of(&format!("node-{dep}")).unwrap();
                let after = recorder.index_of(&format!("node-{i}")).unwrap();
                prop_assert!(
                    before < after,
                    "node-{} ran at {} but its dependency node-{} ran at {}",
                    i, after, dep, before
                );
            }
        }
    }
}
