// src/node/arena.rs

//! Generational slot pools for node storage.
//!
//! Nodes are never destroyed individually: releasing one resets its slot and
//! puts it back on the free list, and the slot's generation is bumped so any
//! handle still carrying the old [`NodeId`] resolves to nothing instead of
//! silently aliasing the recycled node. One pool per node variant keeps the
//! leak accounting per-variant.

use std::sync::Arc;

use tracing::warn;

use crate::engine::wave::WaveState;
use crate::errors::contract_violation;
use crate::node::core::NodeCore;
use crate::types::{FrameId, NodeKind};

/// Stable handle to a pooled node: variant + slot + generation.
///
/// A released slot invalidates every id minted for it; resolving a stale id
/// yields `None` rather than the recycled node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    kind: NodeKind,
    slot: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(kind: NodeKind, slot: u32, generation: u32) -> Self {
        Self {
            kind,
            slot,
            generation,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

struct Slot {
    generation: u32,
    occupied: bool,
    node: Arc<NodeCore>,
}

/// Allocation/release counters of one pool, exposed for diagnostics and the
/// post-run balance property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounters {
    pub allocated: u64,
    pub released: u64,
}

impl PoolCounters {
    pub fn balanced(&self) -> bool {
        self.allocated == self.released
    }

    pub fn in_use(&self) -> u64 {
        self.allocated - self.released
    }
}

/// Counters for every variant pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub tasks: PoolCounters,
    pub parallel_for: PoolCounters,
    pub graphs: PoolCounters,
}

impl PoolStats {
    pub fn balanced(&self) -> bool {
        self.tasks.balanced() && self.parallel_for.balanced() && self.graphs.balanced()
    }
}

/// Fixed-variant pool: grows on demand, recycles released slots.
pub(crate) struct NodePool {
    kind: NodeKind,
    slots: Vec<Slot>,
    free: Vec<u32>,
    counters: PoolCounters,
}

impl NodePool {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            counters: PoolCounters::default(),
        }
    }

    fn allocate(&mut self, frame: FrameId, owner: Option<Arc<WaveState>>) -> Arc<NodeCore> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupied: false,
                    node: Arc::new(NodeCore::vacant(self.kind)),
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.occupied = true;
        let id = NodeId::new(self.kind, index, slot.generation);
        slot.node.prepare(id, frame, owner);
        self.counters.allocated += 1;
        Arc::clone(&slot.node)
    }

    fn release(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.slot as usize) else {
            contract_violation(format!("release of foreign node id {id:?}"));
        };
        if !slot.occupied {
            contract_violation(format!("double release of node id {id:?}"));
        }
        if slot.generation != id.generation {
            contract_violation(format!("release through stale node id {id:?}"));
        }
        slot.node.clear();
        slot.generation = slot.generation.wrapping_add(1);
        slot.occupied = false;
        self.free.push(id.slot);
        self.counters.released += 1;
    }

    fn resolve(&self, id: NodeId) -> Option<Arc<NodeCore>> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.occupied && slot.generation == id.generation {
            Some(Arc::clone(&slot.node))
        } else {
            None
        }
    }

    fn counters(&self) -> PoolCounters {
        self.counters
    }
}

impl Drop for NodePool {
    fn drop(&mut self) {
        if !self.counters.balanced() && !std::thread::panicking() {
            warn!(
                kind = %self.kind,
                allocated = self.counters.allocated,
                released = self.counters.released,
                "node pool dropped with live allocations"
            );
            debug_assert!(
                self.counters.balanced(),
                "{} pool leaked {} node(s)",
                self.kind,
                self.counters.in_use()
            );
        }
    }
}

/// All three variant pools behind one lock.
pub(crate) struct NodeArena {
    tasks: NodePool,
    parallel_for: NodePool,
    graphs: NodePool,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        Self {
            tasks: NodePool::new(NodeKind::Task),
            parallel_for: NodePool::new(NodeKind::ParallelFor),
            graphs: NodePool::new(NodeKind::Graph),
        }
    }

    pub(crate) fn allocate(
        &mut self,
        kind: NodeKind,
        frame: FrameId,
        owner: Option<Arc<WaveState>>,
    ) -> Arc<NodeCore> {
        self.pool_mut(kind).allocate(frame, owner)
    }

    pub(crate) fn release(&mut self, id: NodeId) {
        self.pool_mut(id.kind).release(id);
    }

    pub(crate) fn resolve(&self, id: NodeId) -> Option<Arc<NodeCore>> {
        self.pool(id.kind).resolve(id)
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            tasks: self.tasks.counters(),
            parallel_for: self.parallel_for.counters(),
            graphs: self.graphs.counters(),
        }
    }

    fn pool(&self, kind: NodeKind) -> &NodePool {
        match kind {
            NodeKind::Task => &self.tasks,
            NodeKind::ParallelFor => &self.parallel_for,
            NodeKind::Graph => &self.graphs,
        }
    }

    fn pool_mut(&mut self, kind: NodeKind) -> &mut NodePool {
        match kind {
            NodeKind::Task => &mut self.tasks,
            NodeKind::ParallelFor => &mut self.parallel_for,
            NodeKind::Graph => &mut self.graphs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::locked;

    #[test]
    fn released_slots_are_recycled_with_a_new_generation() {
        let mut arena = NodeArena::new();
        let first = arena.allocate(NodeKind::Task, 1, None);
        let first_id = locked(&first.config).id;
        arena.release(first_id);

        let second = arena.allocate(NodeKind::Task, 1, None);
        let second_id = locked(&second.config).id;

        // Same slot, different generation.
        assert_ne!(first_id, second_id);
        assert!(arena.resolve(first_id).is_none());
        assert!(arena.resolve(second_id).is_some());

        arena.release(second_id);
        assert!(arena.stats().balanced());
    }

    #[test]
    fn counters_track_per_variant_allocations() {
        let mut arena = NodeArena::new();
        let task = arena.allocate(NodeKind::Task, 1, None);
        let graph = arena.allocate(NodeKind::Graph, 1, None);
        assert_eq!(arena.stats().tasks.in_use(), 1);
        assert_eq!(arena.stats().graphs.in_use(), 1);
        assert_eq!(arena.stats().parallel_for.in_use(), 0);

        let task_id = locked(&task.config).id;
        let graph_id = locked(&graph.config).id;
        arena.release(task_id);
        arena.release(graph_id);
        assert!(arena.stats().balanced());
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn double_release_is_fatal() {
        let mut arena = NodeArena::new();
        let node = arena.allocate(NodeKind::Task, 1, None);
        let id = locked(&node.config).id;
        arena.release(id);
        arena.release(id);
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn release_of_foreign_id_is_fatal() {
        let mut arena = NodeArena::new();
        arena.release(NodeId::new(NodeKind::Task, 42, 0));
    }
}
