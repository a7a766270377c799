//! Data models for Courier

mod record;

pub use record::{
    validate_content, Record, RecordId, SyncStatus, BODY_MAX_CHARS, TITLE_MAX_CHARS,
};
