//! Thread-safe execution recorder for ordering assertions.

use std::sync::{Arc, Mutex};

/// Records labelled marks in the order they happen across threads.
///
/// Clones share the same underlying log, so a test can hand one clone to
/// each node callback and assert on the combined order afterwards.
#[derive(Clone, Default)]
pub struct ExecutionRecorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mark.
    pub fn mark(&self, label: impl Into<String>) {
        self.entries
            .lock()
            .expect("recorder lock poisoned")
            .push(label.into());
    }

    /// All marks recorded so far, in order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("recorder lock poisoned")
            .clone()
    }

    /// Position of the first mark with this label.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.snapshot().iter().position(|entry| entry == label)
    }

    /// Number of marks with this label.
    pub fn count(&self, label: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|entry| entry.as_str() == label)
            .count()
    }

    /// Assert `before` was recorded (at least once) earlier than `after`.
    pub fn assert_order(&self, before: &str, after: &str) {
        let snapshot = self.snapshot();
        let b = snapshot.iter().position(|e| e == before);
        let a = snapshot.iter().position(|e| e == after);
        match (b, a) {
            (Some(b), Some(a)) => assert!(
                b < a,
                "expected '{before}' (index {b}) before '{after}' (index {a}); log: {snapshot:?}"
            ),
            _ => panic!("missing marks '{before}'/'{after}' in log: {snapshot:?}"),
        }
    }
}
