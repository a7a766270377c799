use std::path::Path;

use crate::commands::common::{normalize_title, open_service};
use crate::error::CliError;

pub async fn run_add(title: &str, body_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let title = normalize_title(title).ok_or(CliError::EmptyTitle)?;
    let body = body_parts.join(" ");

    let service = open_service(db_path).await?;
    let record = service.create_record(&title, &body).await?;

    println!("{}", record.id);
    Ok(())
}

/// Quick capture mode: every word becomes part of the title.
pub async fn run_quick_add(parts: &[String], db_path: &Path) -> Result<(), CliError> {
    run_add(&parts.join(" "), &[], db_path).await
}
