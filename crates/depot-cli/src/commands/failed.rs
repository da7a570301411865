use std::path::Path;

use depot_core::models::FailedSyncEntry;
use depot_core::sync::FailedSyncStore;

use crate::commands::common::{
    FailedSyncItem, failed_entry_to_item, format_failed_lines, open_database,
};
use crate::error::CliError;

pub async fn list_failed(db_path: &Path) -> Result<Vec<FailedSyncEntry>, CliError> {
    let database = open_database(db_path).await?;
    Ok(database.failed_entries().await?)
}

pub async fn run_failed(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let entries = list_failed(db_path).await?;

    if as_json {
        let json_items = entries
            .iter()
            .map(failed_entry_to_item)
            .collect::<Vec<FailedSyncItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No failed refreshes queued.");
        return Ok(());
    }

    for line in format_failed_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}
