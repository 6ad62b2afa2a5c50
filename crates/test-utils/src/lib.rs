pub mod builders;
pub mod recorder;

use std::sync::Once;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run `f` on a helper thread and panic if it does not finish within
/// `limit`.
///
/// Scheduler liveness tests hang instead of failing when something
/// deadlocks; this turns the hang into a diagnosable panic.
pub fn deadline<T, F>(limit: Duration, f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("deadline-worker".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .expect("failed to spawn deadline worker");

    match rx.recv_timeout(limit) {
        Ok(value) => {
            let _ = worker.join();
            value
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // The closure panicked before sending; surface that panic.
            match worker.join() {
                Err(payload) => std::panic::resume_unwind(payload),
                Ok(_) => unreachable!("worker finished without sending a result"),
            }
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {limit:?} deadline (likely deadlock)")
        }
    }
}
