// src/engine/wave.rs

//! One wave of scheduled work: the nested scheduler handed to graph bodies
//! and the pending counter its creator drains against.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, trace};

use crate::engine::core::SchedulerCore;
use crate::errors::{contract_violation, locked};
use crate::lane::worker::{WorkerContext, inline_work_loop};
use crate::node::arena::NodeId;
use crate::node::core::{CommitOutcome, NodeCore};
use crate::node::handle::{GraphHandle, ParallelForHandle, TaskHandle};
use crate::types::NodeKind;

/// Pending-child counter of one wave.
///
/// Armed once with the number of children that want to run, decremented on
/// every child completion; the thread inline-draining the wave exits when
/// it observes zero.
#[derive(Default)]
pub struct WaveState {
    pending: AtomicUsize,
}

impl WaveState {
    fn arm(&self, count: usize) {
        self.pending.store(count, Ordering::Release);
    }

    pub(crate) fn complete_one(&self) {
        let prev = self.pending.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            contract_violation("wave pending counter underflow");
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

/// The scheduler handed to graph bodies.
///
/// Children created through it stay unpublished until the body returns;
/// the graph node then finalizes the batch: dependency counts are
/// published, dependency-free children are enqueued, and the calling
/// thread inline-drains its own lane until the wave is empty.
pub struct WaveScheduler {
    core: Arc<SchedulerCore>,
    wave: Arc<WaveState>,
    children: Vec<Arc<NodeCore>>,
}

impl WaveScheduler {
    pub(crate) fn new(core: Arc<SchedulerCore>) -> Self {
        Self {
            core,
            wave: Arc::new(WaveState::default()),
            children: Vec::new(),
        }
    }

    /// Create a leaf task node owned by this wave.
    pub fn task(&mut self) -> TaskHandle {
        TaskHandle::new(self.child(NodeKind::Task))
    }

    /// Create a parallel-for node owned by this wave.
    pub fn parallel_for(&mut self) -> ParallelForHandle {
        ParallelForHandle::new(self.child(NodeKind::ParallelFor))
    }

    /// Create a nested graph node owned by this wave.
    pub fn graph(&mut self) -> GraphHandle {
        GraphHandle::new(self.child(NodeKind::Graph))
    }

    fn child(&mut self, kind: NodeKind) -> Arc<NodeCore> {
        let node = self.core.allocate(kind, Some(Arc::clone(&self.wave)));
        self.children.push(Arc::clone(&node));
        node
    }

    /// Publish and drain the batch. Called by the owning node's execution
    /// after the user body returned, never by user code.
    pub(crate) fn finalize(self, ctx: &WorkerContext) {
        if self.children.is_empty() {
            return;
        }
        self.ensure_acyclic();

        let mut armed = 0usize;
        let mut ready = Vec::new();
        for child in &self.children {
            match child.commit() {
                CommitOutcome::Committed { ready: true } => {
                    armed += 1;
                    ready.push(Arc::clone(child));
                }
                CommitOutcome::Committed { ready: false } => armed += 1,
                CommitOutcome::AlreadySubmitted => {}
            }
        }
        if armed == 0 {
            return;
        }

        // Arm before the first enqueue: a child may complete on another
        // lane before this loop finishes.
        self.wave.arm(armed);
        trace!(children = armed, lane = %ctx.lane, "wave published");
        for node in ready {
            self.core.enqueue_ready(node);
        }

        inline_work_loop(&self.core, ctx, &self.wave);
        debug!(children = armed, lane = %ctx.lane, "wave drained");
    }

    /// A cyclic batch can never drain; reject it up front.
    fn ensure_acyclic(&self) {
        let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();
        for child in &self.children {
            let cfg = locked(&child.config);
            graph.add_node(cfg.id);
            for dep in &cfg.depends_on {
                graph.add_edge(*dep, cfg.id, ());
            }
        }
        if is_cyclic_directed(&graph) {
            contract_violation("dependency cycle in scheduled batch");
        }
    }
}
