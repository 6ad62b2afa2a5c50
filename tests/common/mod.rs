#![allow(dead_code)]

pub use taskwave_test_utils::builders::ConfigFileBuilder;
pub use taskwave_test_utils::recorder::ExecutionRecorder;
pub use taskwave_test_utils::{deadline, init_tracing};

use std::time::Duration;

/// Default deadline for liveness-sensitive scheduler tests.
pub const TEST_DEADLINE: Duration = Duration::from_secs(20);
