// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

use std::time::Duration;

use cellfarm::engine::RuntimeOptions;
use cellfarm::types::FailurePolicy;

pub use cellfarm_test_utils::builders::MockFarm;
pub use cellfarm_test_utils::{init_tracing, with_timeout};

/// Runtime options with a short poll interval so scenarios finish quickly.
pub fn fast_options() -> RuntimeOptions {
    RuntimeOptions {
        poll_interval: Duration::from_millis(2),
        ..RuntimeOptions::default()
    }
}

pub fn requeue_options(max_attempts: u32) -> RuntimeOptions {
    RuntimeOptions {
        on_failure: FailurePolicy::Requeue,
        max_attempts,
        ..fast_options()
    }
}
