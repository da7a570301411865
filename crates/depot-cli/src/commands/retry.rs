use std::path::Path;

use crate::commands::common::{format_drain_lines, load_config, open_engine};
use crate::error::CliError;

pub async fn run_retry(db_path: &Path) -> Result<(), CliError> {
    let config = load_config()?;
    let engine = open_engine(&config, db_path).await?;

    let report = engine.retry_failed().await?;
    for line in format_drain_lines(&report) {
        println!("{line}");
    }
    Ok(())
}
