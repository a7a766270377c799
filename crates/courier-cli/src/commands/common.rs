use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use courier_core::remote::RemoteConfig;
use courier_core::sync::PassResult;
use courier_core::{Record, RecordId, RecordService};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub title: String,
    pub status: String,
    pub created_at: i64,
    pub relative_time: String,
    pub remote_id: Option<String>,
    pub sync_error: Option<String>,
}

/// Resolve the database file path from flag, environment, or platform
/// data directory.
pub fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    if let Ok(path) = env::var("COURIER_DB_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("courier")
        .join("courier.db")
}

/// Resolve the remote endpoint from flag or environment value.
pub fn resolve_remote_endpoint(flag: Option<&str>, env_value: Option<String>) -> Option<String> {
    flag.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .or_else(|| {
            env_value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
}

/// Open the engine without a remote endpoint (capture and inspection only).
pub async fn open_service(db_path: &Path) -> Result<RecordService, CliError> {
    Ok(RecordService::open_path(db_path, None).await?)
}

/// Open the engine with a remote endpoint; fails when none is configured.
pub async fn open_sync_service(
    db_path: &Path,
    remote_flag: Option<&str>,
) -> Result<RecordService, CliError> {
    let endpoint = resolve_remote_endpoint(remote_flag, env::var("COURIER_REMOTE_URL").ok())
        .ok_or(CliError::RemoteNotConfigured)?;
    let config = RemoteConfig::new(endpoint)?;
    tracing::debug!(endpoint = config.endpoint(), "Using remote endpoint");
    Ok(RecordService::open_path(db_path, Some(config)).await?)
}

/// Resolve a record from an exact id or a unique id prefix.
pub async fn resolve_record(
    record_query: &str,
    service: &RecordService,
) -> Result<Record, CliError> {
    if let Ok(record_id) = record_query.parse::<RecordId>() {
        if let Some(record) = service.get_record(&record_id).await? {
            return Ok(record);
        }
    }

    let matching_ids = service.record_ids_by_prefix(record_query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::RecordNotFound(record_query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<RecordId>()
                .map_err(|_| CliError::RecordNotFound(record_query.to_string()))?;
            service
                .get_record(&resolved_id)
                .await?
                .ok_or_else(|| CliError::RecordNotFound(record_query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(|id| id.chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{record_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let id = record.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let title = record.title_preview(40);
            let status = record.sync_status.as_str();
            let relative_time = format_relative_time(record.created_at, now_ms);

            record.sync_error.as_ref().map_or_else(
                || format!("{short_id:<13}  {title:<40}  {status:<8}  {relative_time}"),
                |error| {
                    format!(
                        "{short_id:<13}  {title:<40}  {status:<8}  {relative_time:<10}  {error}"
                    )
                },
            )
        })
        .collect()
}

pub fn record_to_list_item(record: &Record) -> RecordListItem {
    let now_ms = Utc::now().timestamp_millis();

    RecordListItem {
        id: record.id.to_string(),
        title: record.title.clone(),
        status: record.sync_status.to_string(),
        created_at: record.created_at,
        relative_time: format_relative_time(record.created_at, now_ms),
        remote_id: record.remote_id.clone(),
        sync_error: record.sync_error.clone(),
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn format_pass_summary(result: &PassResult) -> String {
    if !result.ran {
        return "Sync already in progress; nothing started".to_string();
    }
    if result.attempted == 0 {
        return "Nothing to deliver".to_string();
    }
    format!(
        "Delivered {}, failed {}, still pending {} (attempted {})",
        result.synced, result.failed, result.deferred, result.attempted
    )
}

pub fn normalize_title(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
