// src/engine/manager.rs

//! Top-level thread manager and frame pump.
//!
//! The manager owns the worker threads and the lane-to-thread mapping:
//! lane 0 is the calling thread (drained only inside [`run`]), lane 1 is
//! the general pool, lanes 2.. are named dedicated lanes with one owning
//! thread each. `run()` pumps one frame: flush the registered one-time
//! work, advance the frame counter, enqueue the recurring loop graphs, then
//! drain the main lane until the global pending counter reaches zero.
//! Workers survive between pumps; [`stop`] is the permanent teardown.
//!
//! [`run`]: ThreadManager::run
//! [`stop`]: ThreadManager::stop

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_lane_names;
use crate::engine::core::SchedulerCore;
use crate::engine::wave::WaveScheduler;
use crate::errors::{Result, TaskwaveError, contract_violation, locked};
use crate::lane::queue::LaneQueue;
use crate::lane::worker::{WorkerContext, spawn_workers, work_loop};
use crate::node::arena::PoolStats;
use crate::node::core::{CommitOutcome, GraphFn, NodeBody, NodeCore, TaskFn};
use crate::types::{FIRST_DEDICATED_LANE, FrameId, LaneIndex, MAIN_LANE, NodeKind};

/// Work registered for exactly one future pump.
enum OneTimeEntry {
    Task {
        callback: TaskFn,
        wait_event: Option<String>,
    },
    Graph {
        body: GraphFn,
        wait_event: Option<String>,
    },
}

/// A recurring setup graph, re-enqueued on every pump.
struct LoopEntry {
    body: Arc<dyn Fn(&mut WaveScheduler) + Send + Sync>,
    wait_event: Option<String>,
}

pub struct ThreadManager {
    core: Arc<SchedulerCore>,
    workers: Vec<JoinHandle<()>>,
    one_time: Mutex<Vec<OneTimeEntry>>,
    loop_graphs: Mutex<Vec<LoopEntry>>,
}

impl ThreadManager {
    /// Start a manager with `general_threads` pool workers and one worker
    /// per named dedicated lane.
    pub fn new(general_threads: usize, dedicated_lanes: &[&str]) -> Result<Self> {
        let names: Vec<String> = dedicated_lanes.iter().map(|s| s.to_string()).collect();
        Self::build(general_threads, names)
    }

    /// Start a manager from a validated configuration file.
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        Self::build(config.threads.general, config.lane_names())
    }

    fn build(general_threads: usize, dedicated: Vec<String>) -> Result<Self> {
        if general_threads == 0 {
            return Err(TaskwaveError::Config(
                "the general pool needs at least one thread".to_string(),
            ));
        }
        validate_lane_names(&dedicated)?;

        let mut lanes = vec![LaneQueue::new("main"), LaneQueue::new("general")];
        let mut lane_names = HashMap::new();
        let mut dedicated_pairs = Vec::with_capacity(dedicated.len());
        for (offset, name) in dedicated.iter().enumerate() {
            let index = LaneIndex(FIRST_DEDICATED_LANE + offset);
            lanes.push(LaneQueue::new(name.clone()));
            lane_names.insert(name.to_lowercase(), index);
            dedicated_pairs.push((index, name.clone()));
        }

        let core = Arc::new(SchedulerCore::new(lanes, lane_names));
        let workers = spawn_workers(&core, general_threads, &dedicated_pairs)?;
        info!(
            general_threads,
            dedicated_lanes = dedicated.len(),
            "thread manager started"
        );

        Ok(Self {
            core,
            workers,
            one_time: Mutex::new(Vec::new()),
            loop_graphs: Mutex::new(Vec::new()),
        })
    }

    /// Register a task flushed on the next pump only.
    pub fn one_time(&self, callback: impl FnOnce() + Send + 'static) {
        locked(&self.one_time).push(OneTimeEntry::Task {
            callback: Box::new(callback),
            wait_event: None,
        });
    }

    /// Register a one-time task gated on a named event at its pump's frame.
    pub fn one_time_gated(&self, event: impl Into<String>, callback: impl FnOnce() + Send + 'static) {
        locked(&self.one_time).push(OneTimeEntry::Task {
            callback: Box::new(callback),
            wait_event: Some(event.into()),
        });
    }

    /// Register a graph body flushed on the next pump only.
    pub fn one_time_graph(&self, body: impl FnOnce(&mut WaveScheduler) + Send + 'static) {
        locked(&self.one_time).push(OneTimeEntry::Graph {
            body: Box::new(body),
            wait_event: None,
        });
    }

    /// Register a one-time graph gated on a named event.
    pub fn one_time_graph_gated(
        &self,
        event: impl Into<String>,
        body: impl FnOnce(&mut WaveScheduler) + Send + 'static,
    ) {
        locked(&self.one_time).push(OneTimeEntry::Graph {
            body: Box::new(body),
            wait_event: Some(event.into()),
        });
    }

    /// Register a recurring setup graph, re-enqueued on every pump.
    pub fn loop_function(&self, body: impl Fn(&mut WaveScheduler) + Send + Sync + 'static) {
        locked(&self.loop_graphs).push(LoopEntry {
            body: Arc::new(body),
            wait_event: None,
        });
    }

    /// Register a recurring setup graph gated on a named event at each
    /// pump's frame.
    pub fn loop_function_gated(
        &self,
        event: impl Into<String>,
        body: impl Fn(&mut WaveScheduler) + Send + Sync + 'static,
    ) {
        locked(&self.loop_graphs).push(LoopEntry {
            body: Arc::new(body),
            wait_event: Some(event.into()),
        });
    }

    /// Advance a named event to `frame`, releasing covered waiters.
    pub fn signal_event(&self, event: &str, frame: FrameId) {
        self.core.signal_event(event, frame);
    }

    /// Current frame number; advanced once per pump.
    pub fn current_frame(&self) -> FrameId {
        self.core.current_frame()
    }

    /// Per-variant allocation/release counters of the node pools.
    pub fn pool_stats(&self) -> PoolStats {
        self.core.pool_stats()
    }

    /// Pump one frame.
    ///
    /// Resets the main lane, flushes registered one-time work, advances the
    /// frame counter, enqueues every recurring loop graph, then drains the
    /// main lane on the calling thread until the global pending counter
    /// reaches zero. Returns with the worker threads still running, ready
    /// for the next pump.
    pub fn run(&self) {
        self.core.lane(MAIN_LANE).reset();

        // Allocate every root before enqueuing any: the pending counter
        // must cover the whole pump before the first completion can drive
        // it back to zero.
        let mut roots: Vec<Arc<NodeCore>> = Vec::new();
        for entry in locked(&self.one_time).drain(..) {
            roots.push(match entry {
                OneTimeEntry::Task {
                    callback,
                    wait_event,
                } => self.root(NodeKind::Task, "one-time", wait_event, NodeBody::Task(Some(callback))),
                OneTimeEntry::Graph { body, wait_event } => {
                    self.root(NodeKind::Graph, "one-time-graph", wait_event, NodeBody::Graph(Some(body)))
                }
            });
        }

        let frame = self.core.advance_frame();
        {
            let loop_graphs = locked(&self.loop_graphs);
            for entry in loop_graphs.iter() {
                let body = Arc::clone(&entry.body);
                roots.push(self.root(
                    NodeKind::Graph,
                    "frame-setup",
                    entry.wait_event.clone(),
                    NodeBody::Graph(Some(Box::new(move |wave| body(wave)))),
                ));
            }
        }

        if roots.is_empty() {
            debug!(frame, "pump requested with no registered work");
            return;
        }

        for node in &roots {
            match node.commit() {
                CommitOutcome::Committed { .. } => {}
                CommitOutcome::AlreadySubmitted => {
                    contract_violation("root node submitted twice")
                }
            }
        }
        debug!(frame, roots = roots.len(), "frame pump started");
        for node in roots {
            self.core.enqueue_ready(node);
        }

        work_loop(&self.core, &WorkerContext::new(MAIN_LANE));
        debug!(
            frame,
            parked = self.core.parked_nodes(),
            "frame pump drained"
        );
    }

    /// Permanent teardown: stop every lane and join every worker thread.
    /// In-flight nodes finish; queued nodes are not started.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        info!("stopping scheduler");
        self.core.stop_all_lanes();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked before shutdown");
            }
        }
        let stats = self.core.pool_stats();
        debug!(?stats, "scheduler stopped");
    }

    /// Allocate + configure one root node for the pump.
    fn root(
        &self,
        kind: NodeKind,
        name: &str,
        wait_event: Option<String>,
        body: NodeBody,
    ) -> Arc<NodeCore> {
        let node = self.core.allocate(kind, None);
        let mut cfg = locked(&node.config);
        cfg.name = name.to_string();
        cfg.wait_event = wait_event;
        cfg.body = body;
        drop(cfg);
        node
    }
}

impl Drop for ThreadManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
