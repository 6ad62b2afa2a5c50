// src/node/handle.rs

//! Fluent configuration handles returned by the wave scheduler.
//!
//! Handles are meant to be used inside the graph callback that created them:
//! configure the node, wire dependencies with [`after`], and hand the handle
//! to other `after` calls. Once the wave finalizes the node is published and
//! further configuration is a contract violation.
//!
//! [`after`]: TaskHandle::after

use std::any::Any;
use std::sync::Arc;

use crate::engine::wave::WaveScheduler;
use crate::errors::locked;
use crate::node::core::{NodeBody, NodeCore};
use crate::types::ThreadAffinity;

/// Access to the underlying node shared by every handle variant, so
/// `after` can accept any of them.
pub trait NodeRef {
    #[doc(hidden)]
    fn node(&self) -> &Arc<NodeCore>;
}

macro_rules! impl_common_configurators {
    ($handle:ident) => {
        impl $handle {
            /// Human-readable name used in logs and contract messages.
            pub fn name(self, name: impl Into<String>) -> Self {
                locked(&self.node.config).name = name.into();
                self
            }

            /// Pin execution to the main lane.
            pub fn main_thread(self) -> Self {
                locked(&self.node.config).affinity = ThreadAffinity::Main;
                self
            }

            /// Pin execution to the named dedicated lane.
            pub fn lane(self, name: impl Into<String>) -> Self {
                locked(&self.node.config).affinity = ThreadAffinity::Dedicated(name.into());
                self
            }

            /// Run only after `other` has completed. Repeatable.
            pub fn after(self, other: &impl NodeRef) -> Self {
                self.node.add_dependency(other.node());
                self
            }

            /// Park this node until the named event is signalled for the
            /// node's frame.
            pub fn wait_on_event(self, event: impl Into<String>) -> Self {
                locked(&self.node.config).wait_event = Some(event.into());
                self
            }

            /// Signal the named event at the node's frame when it completes.
            pub fn signal_event(self, event: impl Into<String>) -> Self {
                locked(&self.node.config).signal_event = Some(event.into());
                self
            }

            /// Keep `resource` alive until this node's execution completes.
            pub fn keep_alive(self, resource: Box<dyn Any + Send>) -> Self {
                locked(&self.node.config).resources.push(resource);
                self
            }
        }

        impl NodeRef for $handle {
            fn node(&self) -> &Arc<NodeCore> {
                &self.node
            }
        }
    };
}

/// Handle to a leaf task node.
pub struct TaskHandle {
    node: Arc<NodeCore>,
}

impl TaskHandle {
    pub(crate) fn new(node: Arc<NodeCore>) -> Self {
        Self { node }
    }

    /// The task's callback. A task without one completes as a no-op.
    pub fn work(self, f: impl FnOnce() + Send + 'static) -> Self {
        locked(&self.node.config).body = NodeBody::Task(Some(Box::new(f)));
        self
    }
}

/// Handle to a parallel-for node fanning out into indexed sub-jobs.
pub struct ParallelForHandle {
    node: Arc<NodeCore>,
}

impl ParallelForHandle {
    pub(crate) fn new(node: Arc<NodeCore>) -> Self {
        Self { node }
    }

    /// Callback invoked once per index in `0..job_count`.
    pub fn for_each(self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        {
            let mut cfg = locked(&self.node.config);
            let NodeBody::ParallelFor { func, .. } = &mut cfg.body else {
                unreachable!("parallel-for handle always wraps a parallel-for node");
            };
            *func = Some(Arc::new(f));
        }
        self
    }

    /// Number of sub-jobs to fan out into. Zero completes without work.
    pub fn job_count(self, count: usize) -> Self {
        {
            let mut cfg = locked(&self.node.config);
            let NodeBody::ParallelFor { job_count, .. } = &mut cfg.body else {
                unreachable!("parallel-for handle always wraps a parallel-for node");
            };
            *job_count = count;
        }
        self
    }
}

/// Handle to a composite graph node.
pub struct GraphHandle {
    node: Arc<NodeCore>,
}

impl GraphHandle {
    pub(crate) fn new(node: Arc<NodeCore>) -> Self {
        Self { node }
    }

    /// Body invoked with a nested scheduler when the graph node executes;
    /// children it creates are drained before the graph completes.
    pub fn populate(self, f: impl FnOnce(&mut WaveScheduler) + Send + 'static) -> Self {
        locked(&self.node.config).body = NodeBody::Graph(Some(Box::new(f)));
        self
    }
}

impl_common_configurators!(TaskHandle);
impl_common_configurators!(ParallelForHandle);
impl_common_configurators!(GraphHandle);
