// src/errors.rs

//! Crate-wide error types and fatal-misuse helpers.
//!
//! Recoverable errors exist only at the configuration boundary. Misuse of
//! the scheduler itself (stale handles, double release, foreign lanes) is a
//! programmer-contract violation and is fatal: it panics with a message that
//! carries the `contract violation:` prefix so tests can assert on the
//! specific failure instead of process death.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskwaveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskwaveError>;

/// Abort on scheduler misuse.
///
/// The panic message renders through [`TaskwaveError::ContractViolation`],
/// so `#[should_panic(expected = "contract violation")]` matches every call
/// site.
pub(crate) fn contract_violation(msg: impl Into<String>) -> ! {
    let err = TaskwaveError::ContractViolation(msg.into());
    tracing::error!(%err, "fatal scheduler misuse");
    panic!("{err}");
}

/// Lock a mutex, recovering from poisoning.
///
/// User callbacks never run under a scheduler lock, so a poisoned lock can
/// only come from a scheduler-internal panic; recovering keeps the remaining
/// workers draining instead of cascading the failure.
pub(crate) fn locked<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
