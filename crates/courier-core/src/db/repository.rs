//! Record store implementation

use async_trait::async_trait;
use libsql::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{Record, RecordId, SyncStatus};

/// Per-status record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub syncing: usize,
    pub synced: usize,
    pub failed: usize,
}

/// A status transition persisted in one atomic write.
///
/// `remote_id` is only ever set, never overwritten: the store keeps an
/// existing remote id even if a transition carries a different one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTransition {
    pub status: SyncStatus,
    pub last_sync_attempt: i64,
    pub remote_id: Option<String>,
    pub sync_error: Option<String>,
}

/// Trait for durable record storage operations
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record; fails with `Conflict` if the id already exists
    async fn insert(&self, record: &Record) -> Result<()>;

    /// Get a record by ID
    async fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// List records newest-first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Record>>;

    /// List records in one status, oldest-first (deterministic sync order)
    async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<Record>>;

    /// List record ids starting with the given prefix
    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Claim a pending record for an attempt (`pending` -> `syncing`).
    ///
    /// Returns `false` when the record is no longer pending; the claim is a
    /// compare-and-set so no attempt ever runs against a record another
    /// actor has already moved.
    async fn claim_for_sync(&self, id: &RecordId, attempted_at: i64) -> Result<bool>;

    /// Apply a status transition in one durable write
    async fn apply_transition(&self, id: &RecordId, transition: &SyncTransition) -> Result<()>;

    /// Requeue every failed record (`failed` -> `pending`); returns the count
    async fn requeue_failed(&self) -> Result<usize>;

    /// Count records per status
    async fn counts(&self) -> Result<StatusCounts>;
}

/// libSQL implementation of `RecordStore`
pub struct LibSqlRecordStore {
    conn: Connection,
}

impl LibSqlRecordStore {
    /// Create a new store over the given connection
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &Row) -> Result<Record> {
        let id: String = row.get(0)?;
        let id = id
            .parse::<RecordId>()
            .map_err(|_| Error::Database(format!("Invalid record id in store: {id}")))?;
        let status: String = row.get(4)?;

        Ok(Record {
            id,
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            sync_status: status.parse()?,
            remote_id: row.get(5)?,
            last_sync_attempt: row.get(6)?,
            sync_error: row.get(7)?,
        })
    }

    async fn collect_records(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Record>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }
}

const SELECT_COLUMNS: &str =
    "id, title, body, created_at, sync_status, remote_id, last_sync_attempt, sync_error";

#[async_trait]
impl RecordStore for LibSqlRecordStore {
    async fn insert(&self, record: &Record) -> Result<()> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO records
                    (id, title, body, created_at, sync_status, remote_id, last_sync_attempt, sync_error)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id.as_str(),
                    record.title.clone(),
                    record.body.clone(),
                    record.created_at,
                    record.sync_status.as_str(),
                    record.remote_id.clone(),
                    record.last_sync_attempt,
                    record.sync_error.clone()
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(Error::Conflict(record.id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM records WHERE id = ?");
        let mut rows = self.conn.query(&sql, params![id.as_str()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM records
             ORDER BY created_at DESC
             LIMIT ? OFFSET ?"
        );
        self.collect_records(&sql, params![limit as i64, offset as i64])
            .await
    }

    async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM records
             WHERE sync_status = ?
             ORDER BY created_at ASC"
        );
        self.collect_records(&sql, params![status.as_str()]).await
    }

    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM records WHERE id LIKE ? ORDER BY id LIMIT ?",
                params![format!("{prefix}%"), limit as i64],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    async fn claim_for_sync(&self, id: &RecordId, attempted_at: i64) -> Result<bool> {
        let claimed = self
            .conn
            .execute(
                "UPDATE records
                 SET sync_status = 'syncing', last_sync_attempt = ?
                 WHERE id = ? AND sync_status = 'pending'",
                params![attempted_at, id.as_str()],
            )
            .await?;

        Ok(claimed == 1)
    }

    async fn apply_transition(&self, id: &RecordId, transition: &SyncTransition) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE records
                 SET sync_status = ?,
                     last_sync_attempt = ?,
                     remote_id = COALESCE(remote_id, ?),
                     sync_error = ?
                 WHERE id = ?",
                params![
                    transition.status.as_str(),
                    transition.last_sync_attempt,
                    transition.remote_id.clone(),
                    transition.sync_error.clone(),
                    id.as_str()
                ],
            )
            .await?;

        if updated == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn requeue_failed(&self) -> Result<usize> {
        let requeued = self
            .conn
            .execute(
                "UPDATE records SET sync_status = 'pending' WHERE sync_status = 'failed'",
                (),
            )
            .await?;

        Ok(requeued as usize)
    }

    async fn counts(&self) -> Result<StatusCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT sync_status, COUNT(*) FROM records GROUP BY sync_status",
                (),
            )
            .await?;

        let mut counts = StatusCounts::default();
        while let Some(row) = rows.next().await? {
            let status: String = row.get(0)?;
            let count = row.get::<i64>(1)? as usize;
            counts.total += count;
            match status.parse::<SyncStatus>()? {
                SyncStatus::Pending => counts.pending += count,
                SyncStatus::Syncing => counts.syncing += count,
                SyncStatus::Synced => counts.synced += count,
                SyncStatus::Failed => counts.failed += count,
            }
        }
        Ok(counts)
    }
}
