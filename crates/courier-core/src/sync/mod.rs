//! Sync engine: retry policy, pass coordinator, and trigger scheduler

mod coordinator;
mod retry;
mod scheduler;

pub use coordinator::{
    PassResult, RecordEvent, SyncCoordinator, DEFAULT_INTER_RECORD_DELAY,
};
pub use retry::{
    FailureClass, RetryDecision, RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP,
    DEFAULT_MAX_ATTEMPTS_PER_PASS,
};
pub use scheduler::{SyncScheduler, SyncTrigger, MIN_PERIODIC_INTERVAL};
