use std::path::Path;

use crate::commands::common::open_service;
use crate::error::CliError;

pub async fn run_stats(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let stats = service.stats().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total:    {}", stats.total);
    println!("Synced:   {}", stats.synced);
    println!("Pending:  {}", stats.pending);
    println!("Failed:   {}", stats.failed);
    Ok(())
}
