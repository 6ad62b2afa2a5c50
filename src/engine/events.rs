// src/engine/events.rs

//! Named, frame-scoped event registry.
//!
//! Every event keeps a monotonically non-decreasing signalled-frame
//! high-water mark plus wait buckets keyed by required frame. Signalling a
//! frame releases every bucket at or below it, in frame-ascending order;
//! signalling a frame at or below the mark is a no-op. Waits for frames
//! lower than an already-queued bucket simply land in sorted position.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::node::arena::NodeId;
use crate::types::FrameId;

#[derive(Default)]
struct EventState {
    /// Highest frame signalled so far, `None` before the first signal.
    signaled: Option<FrameId>,
    /// Parked nodes keyed by the frame they require.
    waiters: BTreeMap<FrameId, Vec<NodeId>>,
}

/// Registry of every named event. Guarded by a single mutex in the core, so
/// wait registration and signalling are mutually exclusive.
#[derive(Default)]
pub(crate) struct EventRegistry {
    events: HashMap<String, EventState>,
}

impl EventRegistry {
    /// Advance the event's signalled frame to `max(current, frame)` and
    /// return every parked node whose required frame is now covered, in
    /// frame-ascending order. The caller re-enqueues them; they are never
    /// run inline.
    pub(crate) fn signal(&mut self, name: &str, frame: FrameId) -> Vec<NodeId> {
        let state = self.events.entry(name.to_string()).or_default();
        if state.signaled.is_some_and(|current| current >= frame) {
            debug!(event = %name, frame, "signal at or below high-water mark; ignoring");
            return Vec::new();
        }
        state.signaled = Some(frame);

        let still_waiting = state.waiters.split_off(&(frame + 1));
        let released_buckets = std::mem::replace(&mut state.waiters, still_waiting);

        let mut released = Vec::new();
        for (bucket_frame, nodes) in released_buckets {
            trace!(
                event = %name,
                bucket = bucket_frame,
                count = nodes.len(),
                "releasing wait bucket"
            );
            released.extend(nodes);
        }
        released
    }

    /// Returns true if the node may run immediately (the event already
    /// covers `frame`); otherwise parks the node in its frame bucket and
    /// returns false.
    pub(crate) fn wait_done(&mut self, name: &str, frame: FrameId, node: NodeId) -> bool {
        let state = self.events.entry(name.to_string()).or_default();
        if state.signaled.is_some_and(|current| current >= frame) {
            return true;
        }
        state.waiters.entry(frame).or_default().push(node);
        false
    }

    /// Number of parked nodes across all events (diagnostics).
    pub(crate) fn waiting(&self) -> usize {
        self.events
            .values()
            .map(|state| state.waiters.values().map(Vec::len).sum::<usize>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn id(slot: u32) -> NodeId {
        NodeId::new(NodeKind::Task, slot, 0)
    }

    #[test]
    fn unsignalled_event_parks_the_waiter() {
        let mut registry = EventRegistry::default();
        assert!(!registry.wait_done("load", 5, id(0)));
        assert_eq!(registry.waiting(), 1);
    }

    #[test]
    fn signal_covers_current_and_earlier_frames() {
        let mut registry = EventRegistry::default();
        assert!(!registry.wait_done("load", 5, id(0)));
        assert!(!registry.wait_done("load", 3, id(1)));

        // Signalling frame 5 releases the frame-3 waiter first.
        let released = registry.signal("load", 5);
        assert_eq!(released, vec![id(1), id(0)]);
        assert_eq!(registry.waiting(), 0);

        // Later waits for covered frames run immediately.
        assert!(registry.wait_done("load", 4, id(2)));
    }

    #[test]
    fn stale_signal_is_a_no_op() {
        let mut registry = EventRegistry::default();
        assert!(registry.signal("load", 5).is_empty());
        assert!(!registry.wait_done("load", 6, id(0)));

        // Frame 4 after frame 5 neither lowers the mark nor releases the
        // frame-6 waiter.
        assert!(registry.signal("load", 4).is_empty());
        assert_eq!(registry.waiting(), 1);

        let released = registry.signal("load", 6);
        assert_eq!(released, vec![id(0)]);
    }

    #[test]
    fn buckets_above_the_signalled_frame_stay_parked() {
        let mut registry = EventRegistry::default();
        assert!(!registry.wait_done("load", 2, id(0)));
        assert!(!registry.wait_done("load", 7, id(1)));

        let released = registry.signal("load", 3);
        assert_eq!(released, vec![id(0)]);
        assert_eq!(registry.waiting(), 1);
    }

    #[test]
    fn events_are_independent() {
        let mut registry = EventRegistry::default();
        assert!(!registry.wait_done("load", 1, id(0)));
        assert!(registry.signal("present", 9).is_empty());
        assert_eq!(registry.waiting(), 1);
    }
}
