// src/node/mod.rs

//! Schedulable nodes and their storage.
//!
//! - [`arena`] holds the generational slot pools nodes are allocated from.
//! - [`core`] is the node itself: lifecycle state machine, atomic dependency
//!   counter and the closed body sum type.
//! - [`handle`] is the fluent configuration surface handed to user code.

pub mod arena;
pub mod core;
pub mod handle;

pub use arena::{NodeId, PoolCounters, PoolStats};
pub use handle::{GraphHandle, NodeRef, ParallelForHandle, TaskHandle};
