// src/lib.rs

//! `taskwave` — a frame-scoped task-graph scheduler.
//!
//! Work is expressed as nodes (leaf tasks, parallel-for fan-outs, composite
//! graphs) with explicit dependency edges, pinned to lanes (main thread,
//! general pool, named dedicated threads) and optionally gated on named
//! frame-scoped events. A graph node's body receives a [`WaveScheduler`],
//! creates children, and the scheduler drains them by having the calling
//! thread execute other ready work from its own lane — nested waits make
//! forward progress instead of blocking, so a fixed pool can never deadlock
//! on nesting.
//!
//! The [`ThreadManager`] owns the worker threads and pumps frames: one-time
//! work plus recurring setup graphs per [`ThreadManager::run`] call, driven
//! until the global pending counter reports quiescence.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod lane;
pub mod logging;
pub mod node;
pub mod types;

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;

pub use crate::engine::manager::ThreadManager;
pub use crate::engine::wave::WaveScheduler;
pub use crate::errors::{Result, TaskwaveError};
pub use crate::lane::worker::WorkerContext;
pub use crate::node::arena::{NodeId, PoolCounters, PoolStats};
pub use crate::node::handle::{GraphHandle, NodeRef, ParallelForHandle, TaskHandle};
pub use crate::types::{
    FrameId, GENERAL_LANE, LaneIndex, MAIN_LANE, NodeKind, ThreadAffinity,
};

/// High-level entry point used by `main.rs`: run the demo frame pump.
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = if Path::new(&args.config).exists() {
        load_and_validate(&args.config)?
    } else {
        info!(path = %args.config, "config file not found; using defaults");
        ConfigFile::default()
    };

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let manager = ThreadManager::from_config(&cfg)?;

    // Demo workload: a simulate step, an 8-way fan-out depending on it, and
    // a main-thread present step that signals the frame event consumed by a
    // gated finish task.
    manager.loop_function(|wave| {
        let simulate = wave
            .task()
            .name("simulate")
            .work(|| debug!("simulate step"));
        let shade = wave
            .parallel_for()
            .name("shade")
            .after(&simulate)
            .for_each(|index| debug!(index, "shade job"))
            .job_count(8);
        wave.task()
            .name("present")
            .main_thread()
            .after(&shade)
            .signal_event("frame-done")
            .work(|| debug!("present step"));
        wave.task()
            .name("finish")
            .wait_on_event("frame-done")
            .work(|| debug!("frame finished"));
    });

    let started = Instant::now();
    for _ in 0..args.frames {
        manager.run();
    }
    info!(
        frames = args.frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        last_frame = manager.current_frame(),
        "demo pump finished"
    );

    let stats = manager.pool_stats();
    debug!(?stats, "pool counters at shutdown");
    manager.stop();
    Ok(())
}

/// Simple dry-run output: print the lane layout that would be created.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskwave dry-run");
    println!("  lane 0: main (caller thread)");
    println!(
        "  lane 1: general ({} worker thread(s))",
        cfg.threads.general
    );
    for (offset, lane) in cfg.lanes.iter().enumerate() {
        println!("  lane {}: {} (dedicated)", offset + 2, lane.name);
    }
}
