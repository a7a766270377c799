//! Record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum title length in Unicode scalar values
pub const TITLE_MAX_CHARS: usize = 200;

/// Maximum body length in Unicode scalar values
pub const BODY_MAX_CHARS: usize = 5000;

/// A unique identifier for a record, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Delivery state of a record.
///
/// `Syncing` is a soft lock held by an in-flight sync pass; it is never
/// trusted across restarts. Any record found in `Syncing` when the database
/// opens is reset to `Pending` before the store serves its first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    /// Column value stored for this status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }

    /// Whether the record is in a terminal state for automatic sync
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Synced | Self::Failed)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Database(format!("Unknown sync status: {other}"))),
        }
    }
}

/// A record captured on the device, queued for delivery.
///
/// `title`, `body`, and `created_at` are write-once; only the sync fields
/// change after creation, and only through the sync coordinator (plus the
/// explicit user requeue of failed records).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, generated client-side at creation
    pub id: RecordId,
    /// Short title, validated once at creation
    pub title: String,
    /// Free-form body text
    pub body: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Current delivery state
    pub sync_status: SyncStatus,
    /// Identifier assigned by the remote service; present iff `Synced`,
    /// and never changed once set
    pub remote_id: Option<String>,
    /// Timestamp of the most recent delivery attempt (Unix ms)
    pub last_sync_attempt: Option<i64>,
    /// Last failure description; cleared on success
    pub sync_error: Option<String>,
}

impl Record {
    /// Create a new pending record, validating the content bounds.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Result<Self> {
        let title = title.into();
        let body = body.into();
        validate_content(&title, &body)?;

        Ok(Self {
            id: RecordId::new(),
            title,
            body,
            created_at: chrono::Utc::now().timestamp_millis(),
            sync_status: SyncStatus::Pending,
            remote_id: None,
            last_sync_attempt: None,
            sync_error: None,
        })
    }

    /// Get the title truncated to `max_len` characters for list display
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.title.chars().take(max_len).collect()
    }
}

/// Validate record content against the creation bounds.
///
/// Content is validated exactly once, here; stored records are never
/// re-validated.
pub fn validate_content(title: &str, body: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(Error::Validation(format!(
            "Title exceeds {TITLE_MAX_CHARS} characters"
        )));
    }
    if body.chars().count() > BODY_MAX_CHARS {
        return Err(Error::Validation(format!(
            "Body exceeds {BODY_MAX_CHARS} characters"
        )));
    }
    Ok(())
}
