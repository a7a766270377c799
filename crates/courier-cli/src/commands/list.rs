use std::path::Path;

use crate::cli::StatusFilter;
use crate::commands::common::{
    format_record_lines, open_service, record_to_list_item, RecordListItem,
};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    status: Option<StatusFilter>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let records = match status {
        Some(filter) => {
            let mut records = service.list_by_status(filter.into()).await?;
            // Status listing comes back oldest-first; match the newest-first
            // display order and bound
            records.reverse();
            records.truncate(limit);
            records
        }
        None => service.list_records(limit, 0).await?,
    };

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No records found.");
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
