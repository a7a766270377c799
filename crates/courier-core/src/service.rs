//! Engine facade wiring the store, remote client, and sync coordinator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::{Database, LibSqlRecordStore, RecordStore};
use crate::error::Result;
use crate::models::{Record, RecordId, SyncStatus};
use crate::remote::{HttpRemoteClient, Outcome, RemoteClient, RemoteConfig};
use crate::sync::{
    PassResult, RecordEvent, RetryPolicy, SyncCoordinator, SyncScheduler,
};

/// Store-wide record counts for callers.
///
/// A record mid-attempt (`syncing`) is reported as pending: it is not
/// terminal and resolves before the pass ends or at the next startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub synced: usize,
    pub pending: usize,
    pub failed: usize,
}

/// Placeholder remote used when no endpoint is configured; every attempt is
/// a transient failure, so records simply accumulate as pending.
struct DisconnectedRemote;

#[async_trait::async_trait]
impl RemoteClient for DisconnectedRemote {
    async fn send(&self, _record: &Record) -> Outcome {
        Outcome::Unavailable {
            reason: "Remote endpoint not configured".to_string(),
        }
    }
}

/// The caller-facing engine API.
///
/// All collaborators are injected at construction; there is no global
/// registry. The only process-wide state is the coordinator's single-flight
/// pass lock.
pub struct RecordService {
    _db: Database,
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteClient>,
    coordinator: Arc<SyncCoordinator>,
    scheduler: SyncScheduler,
    remote_configured: bool,
}

impl RecordService {
    /// Open the engine over a database file, creating parent directories as
    /// needed. Without a remote configuration the engine still captures and
    /// lists records; sync passes defer everything.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        remote_config: Option<RemoteConfig>,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        let remote_configured = remote_config.is_some();
        let remote: Arc<dyn RemoteClient> = match remote_config {
            Some(config) => Arc::new(HttpRemoteClient::new(config)?),
            None => {
                tracing::info!("Running without a remote endpoint (capture-only mode)");
                Arc::new(DisconnectedRemote)
            }
        };

        Ok(Self::build(db, remote, remote_configured))
    }

    /// Open an in-memory engine with the given remote (primarily for tests)
    pub async fn open_in_memory(remote: Arc<dyn RemoteClient>) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::build(db, remote, true))
    }

    fn build(db: Database, remote: Arc<dyn RemoteClient>, remote_configured: bool) -> Self {
        let store: Arc<dyn RecordStore> =
            Arc::new(LibSqlRecordStore::new(db.connection().clone()));
        let coordinator = Arc::new(SyncCoordinator::new(store.clone(), remote.clone()));
        let scheduler = SyncScheduler::new(store.clone(), coordinator.clone());

        Self {
            _db: db,
            store,
            remote,
            coordinator,
            scheduler,
            remote_configured,
        }
    }

    /// Replace the retry policy and pass pacing.
    ///
    /// Call before subscribing: the event channel is rebuilt along with the
    /// coordinator.
    #[must_use]
    pub fn configure_sync(mut self, policy: RetryPolicy, inter_record_delay: Duration) -> Self {
        let coordinator = Arc::new(
            SyncCoordinator::new(self.store.clone(), self.remote.clone())
                .with_policy(policy)
                .with_inter_record_delay(inter_record_delay),
        );
        self.scheduler = SyncScheduler::new(self.store.clone(), coordinator.clone());
        self.coordinator = coordinator;
        self
    }

    /// Whether a remote endpoint was configured
    #[must_use]
    pub const fn is_remote_configured(&self) -> bool {
        self.remote_configured
    }

    /// Validate and capture a new record; it starts pending
    pub async fn create_record(&self, title: &str, body: &str) -> Result<Record> {
        let record = Record::new(title, body)?;
        self.store.insert(&record).await?;
        self.coordinator.publish(record.id, SyncStatus::Pending);
        tracing::info!(record_id = %record.id, "Record captured");
        Ok(record)
    }

    /// Fetch a record by id
    pub async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        self.store.get(id).await
    }

    /// List records newest-first
    pub async fn list_records(&self, limit: usize, offset: usize) -> Result<Vec<Record>> {
        self.store.list(limit, offset).await
    }

    /// List records in one delivery state
    pub async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<Record>> {
        self.store.list_by_status(status).await
    }

    /// List record ids starting with the given prefix
    pub async fn record_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.store.list_ids_by_prefix(prefix, limit).await
    }

    /// Run one sync pass over pending records
    pub async fn sync_now(&self) -> Result<PassResult> {
        self.coordinator.sync_now().await
    }

    /// Requeue failed records, then run a pass
    pub async fn retry_failed(&self) -> Result<PassResult> {
        self.coordinator.retry_failed().await
    }

    /// Store-wide record counts
    pub async fn stats(&self) -> Result<StoreStats> {
        let counts = self.store.counts().await?;
        Ok(StoreStats {
            total: counts.total,
            synced: counts.synced,
            pending: counts.pending + counts.syncing,
            failed: counts.failed,
        })
    }

    /// Subscribe to persisted status transitions
    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.coordinator.subscribe()
    }

    /// Host registration point for connectivity/foreground/periodic triggers
    pub const fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }
}
