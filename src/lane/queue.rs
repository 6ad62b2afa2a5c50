// src/lane/queue.rs

//! One lane's FIFO of ready nodes.
//!
//! The stop flag means "this wave of work is exhausted", not "shut down":
//! the main lane is stopped at the end of every frame pump and reset at the
//! start of the next one. Permanent shutdown additionally joins the owning
//! threads (see the manager).

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::errors::locked;
use crate::node::core::NodeCore;

/// Result of a bounded-timeout pop.
pub(crate) enum Popped {
    Node(Arc<NodeCore>),
    Stopped,
    TimedOut,
}

struct LaneInner {
    queue: VecDeque<Arc<NodeCore>>,
    stopped: bool,
}

pub(crate) struct LaneQueue {
    name: String,
    inner: Mutex<LaneInner>,
    ready: Condvar,
}

impl LaneQueue {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(LaneInner {
                queue: VecDeque::new(),
                stopped: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Append a ready node and wake every waiter.
    pub(crate) fn push(&self, node: Arc<NodeCore>) {
        let mut inner = locked(&self.inner);
        inner.queue.push_back(node);
        self.ready.notify_all();
    }

    /// Block until a node is available or the lane is stopped.
    ///
    /// Stop takes priority over queued nodes: after a stop the remaining
    /// queue is not drained (teardown only stops dequeuing).
    pub(crate) fn pop_blocking(&self) -> Option<Arc<NodeCore>> {
        let mut inner = locked(&self.inner);
        loop {
            if inner.stopped {
                return None;
            }
            if let Some(node) = inner.queue.pop_front() {
                return Some(node);
            }
            inner = self
                .ready
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Pop with a bounded wait so an inline-draining thread can re-check its
    /// wave's pending counter even when nothing gets enqueued.
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Popped {
        let mut inner = locked(&self.inner);
        if inner.stopped {
            return Popped::Stopped;
        }
        if let Some(node) = inner.queue.pop_front() {
            return Popped::Node(node);
        }
        let (mut inner, _) = self
            .ready
            .wait_timeout_while(inner, timeout, |inner| {
                inner.queue.is_empty() && !inner.stopped
            })
            .unwrap_or_else(PoisonError::into_inner);
        if inner.stopped {
            return Popped::Stopped;
        }
        match inner.queue.pop_front() {
            Some(node) => Popped::Node(node),
            None => Popped::TimedOut,
        }
    }

    /// Mark the lane stopped and wake every waiter.
    pub(crate) fn stop(&self) {
        let mut inner = locked(&self.inner);
        inner.stopped = true;
        self.ready.notify_all();
    }

    /// Clear the stop flag for the next wave. Queued nodes survive.
    pub(crate) fn reset(&self) {
        locked(&self.inner).stopped = false;
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        locked(&self.inner).queue.len()
    }
}
