use std::path::Path;

use crate::commands::common::{format_pass_summary, open_sync_service};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, remote_flag: Option<&str>) -> Result<(), CliError> {
    let service = open_sync_service(db_path, remote_flag).await?;

    let result = service.sync_now().await?;
    println!("{}", format_pass_summary(&result));
    Ok(())
}

pub async fn run_retry(db_path: &Path, remote_flag: Option<&str>) -> Result<(), CliError> {
    let service = open_sync_service(db_path, remote_flag).await?;

    let result = service.retry_failed().await?;
    println!("{}", format_pass_summary(&result));
    Ok(())
}
