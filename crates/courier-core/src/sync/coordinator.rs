//! Sync pass coordinator.
//!
//! Drives one pass over the currently pending records: claim, send, persist,
//! sequentially and single-flight. Remote failures are recorded on the
//! record and summarized in the [`PassResult`]; only a store-level failure
//! surfaces as an error from [`SyncCoordinator::sync_now`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::db::{RecordStore, SyncTransition};
use crate::error::Result;
use crate::models::{Record, RecordId, SyncStatus};
use crate::remote::{Outcome, RemoteClient};
use crate::sync::retry::{FailureClass, RetryDecision, RetryPolicy};

/// Default pause between records within one pass, to avoid bursting the
/// remote service
pub const DEFAULT_INTER_RECORD_DELAY: Duration = Duration::from_millis(250);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A persisted status transition, observable by subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordEvent {
    pub record_id: RecordId,
    pub status: SyncStatus,
}

/// Aggregate result of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassResult {
    /// Whether a pass actually ran (false when one was already in flight)
    pub ran: bool,
    /// Records this pass picked up
    pub attempted: usize,
    /// Records delivered and marked synced
    pub synced: usize,
    /// Records permanently rejected and marked failed
    pub failed: usize,
    /// Records left pending for a later pass
    pub deferred: usize,
}

impl PassResult {
    pub(crate) fn skipped() -> Self {
        Self::default()
    }
}

/// Terminal step for one record within a pass
enum RecordOutcome {
    Synced,
    Failed,
    Deferred,
}

/// Orchestrates sync passes over the record store.
///
/// All collaborators are injected; the only cross-call state is the pass
/// lock enforcing single-flight execution.
pub struct SyncCoordinator {
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteClient>,
    policy: RetryPolicy,
    inter_record_delay: Duration,
    pass_lock: Mutex<()>,
    events: broadcast::Sender<RecordEvent>,
}

impl SyncCoordinator {
    /// Create a coordinator with the default policy and pacing
    pub fn new(store: Arc<dyn RecordStore>, remote: Arc<dyn RemoteClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            remote,
            policy: RetryPolicy::new(),
            inter_record_delay: DEFAULT_INTER_RECORD_DELAY,
            pass_lock: Mutex::new(()),
            events,
        }
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the pause between records within one pass
    #[must_use]
    pub const fn with_inter_record_delay(mut self, delay: Duration) -> Self {
        self.inter_record_delay = delay;
        self
    }

    /// Subscribe to persisted status transitions
    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, record_id: RecordId, status: SyncStatus) {
        self.events.send(RecordEvent { record_id, status }).ok();
    }

    /// Run one sync pass over all pending records.
    ///
    /// Returns immediately with `ran == false` when a pass is already in
    /// flight; concurrent triggers are safe no-ops.
    pub async fn sync_now(&self) -> Result<PassResult> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            debug!("Sync pass already running; dropping trigger");
            return Ok(PassResult::skipped());
        };

        self.run_pass().await
    }

    /// Requeue every failed record, then run a normal pass
    pub async fn retry_failed(&self) -> Result<PassResult> {
        let failed = self.store.list_by_status(SyncStatus::Failed).await?;
        let requeued = self.store.requeue_failed().await?;
        if requeued > 0 {
            info!(count = requeued, "Requeued failed records");
            for record in &failed {
                self.publish(record.id, SyncStatus::Pending);
            }
        }

        self.sync_now().await
    }

    async fn run_pass(&self) -> Result<PassResult> {
        let pending = self.store.list_by_status(SyncStatus::Pending).await?;
        let mut result = PassResult {
            ran: true,
            ..PassResult::default()
        };

        if pending.is_empty() {
            debug!("No pending records; nothing to sync");
            return Ok(result);
        }

        info!(count = pending.len(), "Starting sync pass");
        let total = pending.len();

        for (index, record) in pending.into_iter().enumerate() {
            result.attempted += 1;
            match self.sync_record(&record).await {
                Ok(RecordOutcome::Synced) => result.synced += 1,
                Ok(RecordOutcome::Failed) => result.failed += 1,
                Ok(RecordOutcome::Deferred) => result.deferred += 1,
                Err(store_error) => {
                    // The record may be stuck in syncing; startup recovery
                    // resets it. The rest of the pass continues.
                    error!(
                        record_id = %record.id,
                        error = %store_error,
                        "Store write failed mid-sync; skipping record"
                    );
                    result.deferred += 1;
                }
            }

            if index + 1 < total && !self.inter_record_delay.is_zero() {
                tokio::time::sleep(self.inter_record_delay).await;
            }
        }

        info!(
            synced = result.synced,
            failed = result.failed,
            deferred = result.deferred,
            "Sync pass complete"
        );
        Ok(result)
    }

    async fn sync_record(&self, record: &Record) -> Result<RecordOutcome> {
        // A pending record that already carries a remote id was accepted on
        // an earlier attempt whose final store write was lost. Finalize it
        // without contacting the remote; resending would duplicate it.
        if record.remote_id.is_some() {
            warn!(
                record_id = %record.id,
                "Pending record already has a remote id; finalizing without resend"
            );
            self.store
                .apply_transition(
                    &record.id,
                    &SyncTransition {
                        status: SyncStatus::Synced,
                        last_sync_attempt: chrono::Utc::now().timestamp_millis(),
                        remote_id: record.remote_id.clone(),
                        sync_error: None,
                    },
                )
                .await?;
            self.publish(record.id, SyncStatus::Synced);
            return Ok(RecordOutcome::Synced);
        }

        let mut attempts = 0u32;
        loop {
            let attempted_at = chrono::Utc::now().timestamp_millis();
            if !self.store.claim_for_sync(&record.id, attempted_at).await? {
                debug!(record_id = %record.id, "Record no longer pending; skipping");
                return Ok(RecordOutcome::Deferred);
            }
            self.publish(record.id, SyncStatus::Syncing);

            let outcome = self.remote.send(record).await;
            attempts += 1;
            let finished_at = chrono::Utc::now().timestamp_millis();

            match outcome {
                Outcome::Accepted { remote_id } => {
                    self.store
                        .apply_transition(
                            &record.id,
                            &SyncTransition {
                                status: SyncStatus::Synced,
                                last_sync_attempt: finished_at,
                                remote_id: Some(remote_id),
                                sync_error: None,
                            },
                        )
                        .await?;
                    self.publish(record.id, SyncStatus::Synced);
                    debug!(record_id = %record.id, "Record delivered");
                    return Ok(RecordOutcome::Synced);
                }
                Outcome::Rejected { reason } => {
                    warn!(record_id = %record.id, reason = %reason, "Record rejected by remote");
                    self.store
                        .apply_transition(
                            &record.id,
                            &SyncTransition {
                                status: SyncStatus::Failed,
                                last_sync_attempt: finished_at,
                                remote_id: None,
                                sync_error: Some(reason),
                            },
                        )
                        .await?;
                    self.publish(record.id, SyncStatus::Failed);
                    return Ok(RecordOutcome::Failed);
                }
                Outcome::Unavailable { reason } => {
                    debug!(
                        record_id = %record.id,
                        attempts,
                        reason = %reason,
                        "Remote unavailable"
                    );
                    match self.policy.next(attempts, FailureClass::Transient) {
                        RetryDecision::Retry { after } => {
                            // Durably back to pending between attempts so
                            // readers see the latest error and a crash loses
                            // nothing.
                            self.persist_pending(&record.id, finished_at, reason).await?;
                            tokio::time::sleep(after).await;
                        }
                        RetryDecision::Defer => {
                            self.persist_pending(&record.id, finished_at, reason).await?;
                            return Ok(RecordOutcome::Deferred);
                        }
                        RetryDecision::GiveUp => {
                            self.store
                                .apply_transition(
                                    &record.id,
                                    &SyncTransition {
                                        status: SyncStatus::Failed,
                                        last_sync_attempt: finished_at,
                                        remote_id: None,
                                        sync_error: Some(reason),
                                    },
                                )
                                .await?;
                            self.publish(record.id, SyncStatus::Failed);
                            return Ok(RecordOutcome::Failed);
                        }
                    }
                }
            }
        }
    }

    async fn persist_pending(
        &self,
        record_id: &RecordId,
        attempted_at: i64,
        reason: String,
    ) -> Result<()> {
        self.store
            .apply_transition(
                record_id,
                &SyncTransition {
                    status: SyncStatus::Pending,
                    last_sync_attempt: attempted_at,
                    remote_id: None,
                    sync_error: Some(reason),
                },
            )
            .await?;
        self.publish(*record_id, SyncStatus::Pending);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlRecordStore};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Remote that replays a scripted sequence of outcomes, optionally
    /// pausing before each response.
    struct ScriptedRemote {
        outcomes: std::sync::Mutex<VecDeque<Outcome>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedRemote {
        fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
            Self {
                outcomes: std::sync::Mutex::new(outcomes.into_iter().collect()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RemoteClient for ScriptedRemote {
        async fn send(&self, _record: &Record) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Outcome::Unavailable {
                    reason: "script exhausted".to_string(),
                })
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new()
            .with_base(Duration::from_millis(1))
            .with_cap(Duration::from_millis(4))
    }

    async fn setup(
        remote: Arc<ScriptedRemote>,
    ) -> (Database, Arc<LibSqlRecordStore>, SyncCoordinator) {
        let db = Database::open_in_memory().await.unwrap();
        let store = Arc::new(LibSqlRecordStore::new(db.connection().clone()));
        let coordinator = SyncCoordinator::new(store.clone(), remote)
            .with_policy(fast_policy())
            .with_inter_record_delay(Duration::ZERO);
        (db, store, coordinator)
    }

    async fn insert_pending(store: &LibSqlRecordStore, title: &str) -> Record {
        let record = Record::new(title, "Body").unwrap();
        store.insert(&record).await.unwrap();
        record
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unavailable_leaves_record_pending_with_error() {
        let remote = Arc::new(ScriptedRemote::new(vec![
            Outcome::Unavailable {
                reason: "no route".to_string(),
            };
            3
        ]));
        let (_db, store, coordinator) = setup(remote.clone()).await;
        let record = insert_pending(&store, "A").await;

        let result = coordinator.sync_now().await.unwrap();
        assert!(result.ran);
        assert_eq!(result.attempted, 1);
        assert_eq!(result.deferred, 1);
        assert_eq!(result.synced, 0);

        let fetched = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Pending);
        assert_eq!(fetched.sync_error, Some("no route".to_string()));
        assert!(fetched.remote_id.is_none());
        assert!(fetched.last_sync_attempt.is_some());
        // Bounded in-pass retries: default policy allows 3 attempts
        assert_eq!(remote.calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn accepted_on_later_pass_clears_error() {
        let remote = Arc::new(ScriptedRemote::new([
            Outcome::Unavailable {
                reason: "offline".to_string(),
            },
            Outcome::Unavailable {
                reason: "offline".to_string(),
            },
            Outcome::Unavailable {
                reason: "offline".to_string(),
            },
            Outcome::Accepted {
                remote_id: "101".to_string(),
            },
        ]));
        let (_db, store, coordinator) = setup(remote).await;
        let record = insert_pending(&store, "A").await;

        coordinator.sync_now().await.unwrap();
        let result = coordinator.sync_now().await.unwrap();
        assert_eq!(result.synced, 1);

        let fetched = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Synced);
        assert_eq!(fetched.remote_id, Some("101".to_string()));
        assert!(fetched.sync_error.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transient_failure_retries_within_pass() {
        let remote = Arc::new(ScriptedRemote::new([
            Outcome::Unavailable {
                reason: "blip".to_string(),
            },
            Outcome::Accepted {
                remote_id: "7".to_string(),
            },
        ]));
        let (_db, store, coordinator) = setup(remote.clone()).await;
        let record = insert_pending(&store, "A").await;

        let result = coordinator.sync_now().await.unwrap();
        assert_eq!(result.synced, 1);
        assert_eq!(result.deferred, 0);
        assert_eq!(remote.calls(), 2);

        let fetched = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_goes_failed_and_is_not_reattempted() {
        let remote = Arc::new(ScriptedRemote::new([
            Outcome::Rejected {
                reason: "title too long".to_string(),
            },
            Outcome::Accepted {
                remote_id: "55".to_string(),
            },
        ]));
        let (_db, store, coordinator) = setup(remote.clone()).await;
        let record = insert_pending(&store, "A").await;

        let first = coordinator.sync_now().await.unwrap();
        assert_eq!(first.failed, 1);

        let fetched = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Failed);
        assert_eq!(fetched.sync_error, Some("title too long".to_string()));

        // A later pass must not touch a failed record
        let second = coordinator.sync_now().await.unwrap();
        assert_eq!(second.attempted, 0);
        assert_eq!(remote.calls(), 1);

        // Explicit requeue re-attempts it
        let third = coordinator.retry_failed().await.unwrap();
        assert_eq!(third.synced, 1);
        assert_eq!(remote.calls(), 2);

        let fetched = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Synced);
        assert_eq!(fetched.remote_id, Some("55".to_string()));
        assert!(fetched.sync_error.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn synced_records_are_never_resent() {
        let remote = Arc::new(ScriptedRemote::new([Outcome::Accepted {
            remote_id: "1".to_string(),
        }]));
        let (_db, store, coordinator) = setup(remote.clone()).await;
        let record = insert_pending(&store, "A").await;

        coordinator.sync_now().await.unwrap();
        let after_first = store.get(&record.id).await.unwrap().unwrap();

        coordinator.sync_now().await.unwrap();
        let after_second = store.get(&record.id).await.unwrap().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_record_with_remote_id_short_circuits() {
        let remote = Arc::new(ScriptedRemote::new([]));
        let (_db, store, coordinator) = setup(remote.clone()).await;
        let record = insert_pending(&store, "A").await;

        // Simulate a crash after remote accept but before the synced status
        // stuck: the remote id is durable, the status still pending.
        store
            .apply_transition(
                &record.id,
                &SyncTransition {
                    status: SyncStatus::Pending,
                    last_sync_attempt: 1,
                    remote_id: Some("77".to_string()),
                    sync_error: None,
                },
            )
            .await
            .unwrap();

        let result = coordinator.sync_now().await.unwrap();
        assert_eq!(result.synced, 1);
        assert_eq!(remote.calls(), 0);

        let fetched = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Synced);
        assert_eq!(fetched.remote_id, Some("77".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_sync_now_runs_exactly_one_pass() {
        let remote = Arc::new(
            ScriptedRemote::new([Outcome::Accepted {
                remote_id: "1".to_string(),
            }])
            .with_delay(Duration::from_millis(100)),
        );
        let (_db, store, coordinator) = setup(remote.clone()).await;
        insert_pending(&store, "A").await;

        let coordinator = Arc::new(coordinator);
        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.sync_now().await.unwrap() })
        };
        // Give the first pass time to take the lock and start sending
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = coordinator.sync_now().await.unwrap();

        let first = first.await.unwrap();
        assert!(first.ran);
        assert!(!second.ran);
        assert_eq!(second.attempted, 0);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn records_attempted_in_creation_order() {
        let remote = Arc::new(ScriptedRemote::new([
            Outcome::Accepted {
                remote_id: "1".to_string(),
            },
            Outcome::Accepted {
                remote_id: "2".to_string(),
            },
        ]));
        let (_db, store, coordinator) = setup(remote).await;

        let mut second = Record::new("Second", "Body").unwrap();
        second.created_at = 200;
        let mut first = Record::new("First", "Body").unwrap();
        first.created_at = 100;
        store.insert(&second).await.unwrap();
        store.insert(&first).await.unwrap();

        coordinator.sync_now().await.unwrap();

        let first_done = store.get(&first.id).await.unwrap().unwrap();
        let second_done = store.get(&second.id).await.unwrap().unwrap();
        // Oldest first: the older record got the first scripted id
        assert_eq!(first_done.remote_id, Some("1".to_string()));
        assert_eq!(second_done.remote_id, Some("2".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_transitions_are_observable() {
        let remote = Arc::new(ScriptedRemote::new([Outcome::Accepted {
            remote_id: "1".to_string(),
        }]));
        let (_db, store, coordinator) = setup(remote).await;
        let record = insert_pending(&store, "A").await;

        let mut events = coordinator.subscribe();
        coordinator.sync_now().await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                RecordEvent {
                    record_id: record.id,
                    status: SyncStatus::Syncing
                },
                RecordEvent {
                    record_id: record.id,
                    status: SyncStatus::Synced
                },
            ]
        );
    }
}
