use std::path::Path;

use crate::commands::common::{format_timestamp, open_service, resolve_record};
use crate::error::CliError;

pub async fn run_show(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = id.trim();
    if normalized_id.is_empty() {
        return Err(CliError::EmptyRecordId);
    }

    let service = open_service(db_path).await?;
    let record = resolve_record(normalized_id, &service).await?;

    println!("id:          {}", record.id);
    println!("status:      {}", record.sync_status);
    println!("created:     {}", format_timestamp(record.created_at));
    if let Some(remote_id) = &record.remote_id {
        println!("remote id:   {remote_id}");
    }
    if let Some(last_attempt) = record.last_sync_attempt {
        println!("last sync:   {}", format_timestamp(last_attempt));
    }
    if let Some(error) = &record.sync_error {
        println!("last error:  {error}");
    }
    println!();
    println!("{}", record.title);
    if !record.body.is_empty() {
        println!();
        println!("{}", record.body);
    }

    Ok(())
}
