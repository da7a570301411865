use std::path::Path;

use depot_core::catalog;

use crate::commands::common::{
    TableStatusItem, format_status_lines, open_database, table_status_item,
};
use crate::error::CliError;

/// Row count and last sync stamp of every catalog table.
pub async fn collect_status(db_path: &Path) -> Result<Vec<TableStatusItem>, CliError> {
    let database = open_database(db_path).await?;
    let stamps = database.list_sync_times().await?;

    let mut items = Vec::with_capacity(catalog().len());
    for descriptor in catalog() {
        let rows = database.count_mirrored(descriptor).await?;
        items.push(table_status_item(descriptor, rows, &stamps));
    }
    Ok(items)
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let items = collect_status(db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_status_lines(&items) {
            println!("{line}");
        }
    }
    Ok(())
}
