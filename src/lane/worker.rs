// src/lane/worker.rs

//! Worker loops and worker thread spawning.
//!
//! The current lane is carried in an explicit [`WorkerContext`] value that
//! is threaded through execution; there is no thread-local scheduling state.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::engine::core::{SchedulerCore, execute_node};
use crate::engine::wave::WaveState;
use crate::errors::Result;
use crate::lane::queue::Popped;
use crate::types::{GENERAL_LANE, LaneIndex};

/// Bound on the inline-drain wait so a nested waiter re-checks its wave's
/// pending counter even when its own lane stays empty.
const INLINE_DRAIN_POLL: Duration = Duration::from_millis(1);

/// The scheduling context of the current thread: which lane it drains.
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext {
    pub lane: LaneIndex,
}

impl WorkerContext {
    pub(crate) fn new(lane: LaneIndex) -> Self {
        Self { lane }
    }
}

/// Blocking loop of a thread that owns its lane: pop, execute, repeat until
/// the lane is stopped.
pub(crate) fn work_loop(core: &Arc<SchedulerCore>, ctx: &WorkerContext) {
    let queue = core.lane(ctx.lane);
    trace!(lane = %queue.name(), "entering work loop");
    while let Some(node) = queue.pop_blocking() {
        execute_node(core, node, ctx);
    }
    trace!(lane = %queue.name(), "work loop stopped");
}

/// Cooperative loop of a thread logically waiting for a nested wave.
///
/// Instead of blocking, the thread keeps executing other ready nodes from
/// its *own* lane until the wave's pending counter reaches zero (or the
/// lane is stopped). A pool of K threads can therefore never deadlock on K
/// nested waits.
pub(crate) fn inline_work_loop(core: &Arc<SchedulerCore>, ctx: &WorkerContext, wave: &WaveState) {
    let queue = core.lane(ctx.lane);
    while !wave.is_finished() {
        match queue.pop_timeout(INLINE_DRAIN_POLL) {
            Popped::Node(node) => execute_node(core, node, ctx),
            Popped::Stopped => {
                debug!(lane = %queue.name(), "lane stopped while inline-draining");
                break;
            }
            Popped::TimedOut => {}
        }
    }
}

/// Spawn the owning threads: `general_threads` on the general lane and one
/// per named dedicated lane.
pub(crate) fn spawn_workers(
    core: &Arc<SchedulerCore>,
    general_threads: usize,
    dedicated: &[(LaneIndex, String)],
) -> Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(general_threads + dedicated.len());

    let spawn = |lane: LaneIndex, thread_name: String| -> Result<JoinHandle<()>> {
        let core = Arc::clone(core);
        let handle = thread::Builder::new().name(thread_name).spawn(move || {
            let ctx = WorkerContext::new(lane);
            debug!(lane = %lane, "worker started");
            work_loop(&core, &ctx);
            debug!(lane = %lane, "worker exiting");
        })?;
        Ok(handle)
    };

    for n in 0..general_threads {
        match spawn(GENERAL_LANE, format!("taskwave-general-{n}")) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                abort_spawned(core, handles);
                return Err(err);
            }
        }
    }
    for (lane, name) in dedicated {
        match spawn(*lane, format!("taskwave-{name}")) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                abort_spawned(core, handles);
                return Err(err);
            }
        }
    }

    Ok(handles)
}

/// A later spawn failed: stop every lane and join what already started.
fn abort_spawned(core: &Arc<SchedulerCore>, handles: Vec<JoinHandle<()>>) {
    core.stop_all_lanes();
    for handle in handles {
        let _ = handle.join();
    }
}
