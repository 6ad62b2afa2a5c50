// src/node/core.rs

//! The schedulable node: lifecycle state machine, atomic dependency counter
//! and the closed body sum type.

use std::any::Any;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::engine::wave::{WaveScheduler, WaveState};
use crate::errors::{contract_violation, locked};
use crate::node::arena::NodeId;
use crate::types::{FrameId, NodeKind, ThreadAffinity};

/// Zero-argument work callback of a leaf task.
pub type TaskFn = Box<dyn FnOnce() + Send>;
/// Indexed callback of a parallel-for fan-out, shared by all sub-jobs.
pub type IndexFn = Arc<dyn Fn(usize) + Send + Sync>;
/// Body of a graph node; receives the scheduler for creating children.
pub type GraphFn = Box<dyn FnOnce(&mut WaveScheduler) + Send>;

/// Lifecycle states. `Running` is not stored; execution is implicit between
/// dequeue and release.
const STATE_VACANT: u8 = 0;
const STATE_PREPARED: u8 = 1;
const STATE_PENDING: u8 = 2;

/// What a node does when executed. The variant matches the pool the node was
/// allocated from and never changes during the node's lifetime.
pub(crate) enum NodeBody {
    /// Slot is in the free list; executing this is a scheduler bug.
    Vacant,
    Task(Option<TaskFn>),
    ParallelFor {
        func: Option<IndexFn>,
        job_count: usize,
    },
    Graph(Option<GraphFn>),
}

impl NodeBody {
    fn initial(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Task => NodeBody::Task(None),
            NodeKind::ParallelFor => NodeBody::ParallelFor {
                func: None,
                job_count: 0,
            },
            NodeKind::Graph => NodeBody::Graph(None),
        }
    }
}

/// Mutable node configuration, written by the owning scheduler before the
/// node is published and read back during execution.
pub(crate) struct NodeConfig {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) affinity: ThreadAffinity,
    pub(crate) frame: FrameId,
    /// Event this node must wait for (at `frame`) before it may run.
    pub(crate) wait_event: Option<String>,
    /// Event signalled (at `frame`) when this node completes.
    pub(crate) signal_event: Option<String>,
    pub(crate) depends_on: Vec<NodeId>,
    pub(crate) dependents: Vec<NodeId>,
    /// Wave that created this node; `None` for manager roots.
    pub(crate) owner: Option<Arc<WaveState>>,
    pub(crate) body: NodeBody,
    /// Opaque handles kept alive until execution completes.
    pub(crate) resources: Vec<Box<dyn Any + Send>>,
}

/// One schedulable node.
///
/// Shared across threads through `Arc`; the atomic state and dependency
/// counter are the only fields touched concurrently, everything else lives
/// behind the config mutex and is written only by the owning scheduler
/// before publication.
pub struct NodeCore {
    kind: NodeKind,
    state: AtomicU8,
    pending_deps: AtomicU32,
    pub(crate) config: Mutex<NodeConfig>,
}

/// Result of publishing a node's dependency count.
pub(crate) enum CommitOutcome {
    /// The node transitioned Prepared -> Pending; `ready` means it has no
    /// unresolved dependencies and can be enqueued immediately.
    Committed { ready: bool },
    /// The node was already submitted; the double-submission guard fired.
    AlreadySubmitted,
}

impl NodeCore {
    pub(crate) fn vacant(kind: NodeKind) -> Self {
        Self {
            kind,
            state: AtomicU8::new(STATE_VACANT),
            pending_deps: AtomicU32::new(0),
            config: Mutex::new(NodeConfig {
                id: NodeId::new(kind, 0, 0),
                name: String::new(),
                affinity: ThreadAffinity::General,
                frame: 0,
                wait_event: None,
                signal_event: None,
                depends_on: Vec::new(),
                dependents: Vec::new(),
                owner: None,
                body: NodeBody::Vacant,
                resources: Vec::new(),
            }),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Reset the slot for a fresh allocation.
    pub(crate) fn prepare(&self, id: NodeId, frame: FrameId, owner: Option<Arc<WaveState>>) {
        {
            let mut cfg = locked(&self.config);
            cfg.id = id;
            cfg.name.clear();
            cfg.affinity = ThreadAffinity::General;
            cfg.frame = frame;
            cfg.wait_event = None;
            cfg.signal_event = None;
            cfg.depends_on.clear();
            cfg.dependents.clear();
            cfg.owner = owner;
            cfg.body = NodeBody::initial(self.kind);
            cfg.resources.clear();
        }
        self.pending_deps.store(0, Ordering::Release);
        self.state.store(STATE_PREPARED, Ordering::Release);
    }

    /// Return the slot to its vacant state, dropping body and resources.
    pub(crate) fn clear(&self) {
        {
            let mut cfg = locked(&self.config);
            cfg.name.clear();
            cfg.wait_event = None;
            cfg.signal_event = None;
            cfg.depends_on.clear();
            cfg.dependents.clear();
            cfg.owner = None;
            cfg.body = NodeBody::Vacant;
            cfg.resources.clear();
        }
        self.pending_deps.store(0, Ordering::Release);
        self.state.store(STATE_VACANT, Ordering::Release);
    }

    /// Publish the dependency count, transitioning Prepared -> Pending.
    ///
    /// The CAS is the double-submission guard; the count is stored with
    /// release ordering so concurrent decrements observe a consistent
    /// initial value. Safe because predecessors are never enqueued before
    /// the whole batch has committed.
    pub(crate) fn commit(&self) -> CommitOutcome {
        match self.state.compare_exchange(
            STATE_PREPARED,
            STATE_PENDING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                let deps = locked(&self.config).depends_on.len() as u32;
                self.pending_deps.store(deps, Ordering::Release);
                CommitOutcome::Committed { ready: deps == 0 }
            }
            Err(_) => CommitOutcome::AlreadySubmitted,
        }
    }

    /// One predecessor finished. Returns true on the single decrement that
    /// observes the transition to zero; that caller (and only that caller)
    /// enqueues the node.
    pub(crate) fn notify_dependency_finished(&self) -> bool {
        let prev = self.pending_deps.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            contract_violation("dependency counter underflow: notified more often than declared");
        }
        prev == 1
    }

    /// Record `self` depends on `other`, building the inverse edge as well.
    ///
    /// Both nodes must still be un-submitted and belong to the same wave.
    pub(crate) fn add_dependency(self: &Arc<Self>, other: &Arc<NodeCore>) {
        if Arc::ptr_eq(self, other) {
            contract_violation("node cannot depend on itself");
        }
        if self.state.load(Ordering::Acquire) != STATE_PREPARED {
            contract_violation("dependency declared after the node was submitted");
        }
        let (self_id, other_id) = {
            let mut mine = locked(&self.config);
            let mut theirs = locked(&other.config);
            let same_owner = match (&mine.owner, &theirs.owner) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if !same_owner {
                contract_violation(format!(
                    "dependency between nodes owned by different schedulers ('{}' -> '{}')",
                    mine.name, theirs.name
                ));
            }
            mine.depends_on.push(theirs.id);
            theirs.dependents.push(mine.id);
            (mine.id, theirs.id)
        };
        trace!(node = ?self_id, depends_on = ?other_id, "dependency declared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(kind: NodeKind) -> Arc<NodeCore> {
        let node = Arc::new(NodeCore::vacant(kind));
        node.prepare(NodeId::new(kind, 0, 0), 1, None);
        node
    }

    #[test]
    fn commit_without_dependencies_is_immediately_ready() {
        let node = fresh(NodeKind::Task);
        assert!(matches!(
            node.commit(),
            CommitOutcome::Committed { ready: true }
        ));
    }

    #[test]
    fn second_commit_is_rejected() {
        let node = fresh(NodeKind::Task);
        assert!(matches!(node.commit(), CommitOutcome::Committed { .. }));
        assert!(matches!(node.commit(), CommitOutcome::AlreadySubmitted));
    }

    #[test]
    fn exactly_one_notification_observes_zero() {
        let a = fresh(NodeKind::Task);
        let sink = fresh(NodeKind::Task);
        sink.add_dependency(&a);
        sink.add_dependency(&a); // repeatable, counted per edge
        assert!(matches!(
            sink.commit(),
            CommitOutcome::Committed { ready: false }
        ));
        assert!(!sink.notify_dependency_finished());
        assert!(sink.notify_dependency_finished());
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn self_dependency_is_fatal() {
        let node = fresh(NodeKind::Task);
        node.add_dependency(&node);
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn over_notification_is_fatal() {
        let node = fresh(NodeKind::Task);
        let _ = node.commit();
        let _ = node.notify_dependency_finished();
    }
}
