// src/engine/core.rs

//! Shared scheduler state and node execution.
//!
//! `SchedulerCore` owns the node arena, the lane queues, the event registry
//! and the global pending counter. Execution lives here too: popping
//! threads call [`execute_node`], which runs the node body and then walks
//! the completion chain (successor notification, event signalling, owner
//! notification, release, quiescence detection).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::engine::events::EventRegistry;
use crate::engine::wave::{WaveScheduler, WaveState};
use crate::errors::{contract_violation, locked};
use crate::lane::queue::LaneQueue;
use crate::lane::worker::WorkerContext;
use crate::node::arena::{NodeArena, NodeId, PoolStats};
use crate::node::core::{NodeBody, NodeCore};
use crate::types::{FrameId, GENERAL_LANE, LaneIndex, MAIN_LANE, NodeKind, ThreadAffinity};

pub(crate) struct SchedulerCore {
    lanes: Vec<LaneQueue>,
    /// Lowercased dedicated-lane name -> lane index. Built once at
    /// construction, read-only afterwards.
    lane_names: HashMap<String, LaneIndex>,
    arena: Mutex<NodeArena>,
    events: Mutex<EventRegistry>,
    /// Incremented on every allocation, decremented on every completion.
    /// Zero means the current wave of work is exhausted and stops the main
    /// lane (workers keep running for the next pump).
    pending: AtomicUsize,
    frame: AtomicU64,
}

impl SchedulerCore {
    pub(crate) fn new(lanes: Vec<LaneQueue>, lane_names: HashMap<String, LaneIndex>) -> Self {
        Self {
            lanes,
            lane_names,
            arena: Mutex::new(NodeArena::new()),
            events: Mutex::new(EventRegistry::default()),
            pending: AtomicUsize::new(0),
            frame: AtomicU64::new(0),
        }
    }

    pub(crate) fn lane(&self, index: LaneIndex) -> &LaneQueue {
        &self.lanes[index.0]
    }

    pub(crate) fn stop_all_lanes(&self) {
        for lane in &self.lanes {
            lane.stop();
        }
    }

    pub(crate) fn current_frame(&self) -> FrameId {
        self.frame.load(Ordering::Acquire)
    }

    pub(crate) fn advance_frame(&self) -> FrameId {
        self.frame.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn pool_stats(&self) -> PoolStats {
        locked(&self.arena).stats()
    }

    /// Nodes parked on not-yet-signalled events (diagnostics).
    pub(crate) fn parked_nodes(&self) -> usize {
        locked(&self.events).waiting()
    }

    /// Allocate a node at the current frame; counts toward quiescence.
    pub(crate) fn allocate(
        &self,
        kind: NodeKind,
        owner: Option<Arc<WaveState>>,
    ) -> Arc<NodeCore> {
        let frame = self.current_frame();
        let node = locked(&self.arena).allocate(kind, frame, owner);
        self.pending.fetch_add(1, Ordering::AcqRel);
        node
    }

    pub(crate) fn resolve(&self, id: NodeId) -> Option<Arc<NodeCore>> {
        locked(&self.arena).resolve(id)
    }

    /// Route a node that just became ready: park it if it waits on an
    /// unsignalled event, otherwise push it onto its affinity's lane.
    pub(crate) fn enqueue_ready(&self, node: Arc<NodeCore>) {
        let (id, name, frame, wait_event) = {
            let cfg = locked(&node.config);
            (cfg.id, cfg.name.clone(), cfg.frame, cfg.wait_event.clone())
        };
        if let Some(event) = wait_event {
            let admitted = locked(&self.events).wait_done(&event, frame, id);
            if !admitted {
                debug!(node = %name, event = %event, frame, "node parked on event");
                return;
            }
        }
        self.enqueue_to_lane(node);
    }

    /// Push straight onto the affinity lane, bypassing the event gate (used
    /// for nodes an event release just admitted).
    fn enqueue_to_lane(&self, node: Arc<NodeCore>) {
        let (name, affinity) = {
            let cfg = locked(&node.config);
            (cfg.name.clone(), cfg.affinity.clone())
        };
        let lane = self.lane_for(&affinity, &name);
        trace!(node = %name, lane = %lane, "node enqueued");
        self.lanes[lane.0].push(node);
    }

    fn lane_for(&self, affinity: &ThreadAffinity, node_name: &str) -> LaneIndex {
        match affinity {
            ThreadAffinity::Main => MAIN_LANE,
            ThreadAffinity::General => GENERAL_LANE,
            ThreadAffinity::Dedicated(name) => {
                match self.lane_names.get(&name.to_lowercase()) {
                    Some(index) => *index,
                    None => contract_violation(format!(
                        "node '{node_name}' requests unknown dedicated lane '{name}'"
                    )),
                }
            }
        }
    }

    /// Advance the named event and re-enqueue every waiter it releases.
    pub(crate) fn signal_event(&self, name: &str, frame: FrameId) {
        let released = locked(&self.events).signal(name, frame);
        if released.is_empty() {
            return;
        }
        debug!(event = %name, frame, count = released.len(), "event released parked nodes");
        for id in released {
            let Some(node) = self.resolve(id) else {
                contract_violation(format!("event '{name}' released stale node id {id:?}"));
            };
            self.enqueue_to_lane(node);
        }
    }

    /// Completion chain: notify successors, signal the bound event, notify
    /// the owner wave, release the node, detect quiescence.
    fn finalize_execution(&self, node: Arc<NodeCore>, name: String) {
        let (id, frame, dependents, signal_event, owner) = {
            let mut cfg = locked(&node.config);
            (
                cfg.id,
                cfg.frame,
                std::mem::take(&mut cfg.dependents),
                cfg.signal_event.take(),
                cfg.owner.take(),
            )
        };

        for dependent in dependents {
            let Some(successor) = self.resolve(dependent) else {
                contract_violation(format!(
                    "successor {dependent:?} of node '{name}' was released before it ran"
                ));
            };
            if successor.notify_dependency_finished() {
                self.enqueue_ready(successor);
            }
        }

        if let Some(event) = signal_event {
            self.signal_event(&event, frame);
        }

        if let Some(owner) = owner {
            owner.complete_one();
        }

        locked(&self.arena).release(id);
        trace!(node = %name, "node completed and released");

        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("all scheduled work drained; stopping main lane");
            self.lane(MAIN_LANE).stop();
        }
    }
}

/// Run one node to completion on the current thread.
///
/// Composite bodies build a nested wave bound to `ctx`'s lane, so the
/// thread executing them inline-drains its own queue while the wave runs.
pub(crate) fn execute_node(core: &Arc<SchedulerCore>, node: Arc<NodeCore>, ctx: &WorkerContext) {
    let (name, body) = {
        let mut cfg = locked(&node.config);
        (
            cfg.name.clone(),
            std::mem::replace(&mut cfg.body, NodeBody::Vacant),
        )
    };
    trace!(node = %name, lane = %ctx.lane, "executing node");

    match body {
        NodeBody::Vacant => contract_violation(format!("node '{name}' executed without a body")),
        NodeBody::Task(callback) => {
            // A task without a callback is a no-op, not an error.
            if let Some(callback) = callback {
                callback();
            }
        }
        NodeBody::ParallelFor { func, job_count } => {
            let mut wave = WaveScheduler::new(Arc::clone(core));
            if let Some(func) = func {
                for index in 0..job_count {
                    let func = Arc::clone(&func);
                    wave.task()
                        .name(format!("{name}[{index}]"))
                        .work(move || func(index));
                }
            }
            wave.finalize(ctx);
        }
        NodeBody::Graph(body) => {
            let mut wave = WaveScheduler::new(Arc::clone(core));
            if let Some(body) = body {
                body(&mut wave);
            }
            wave.finalize(ctx);
        }
    }

    core.finalize_execution(node, name);
}
