use std::path::Path;

use crate::commands::common::{
    format_dispatch_lines, format_drain_lines, load_config, open_engine, read_payload,
};
use crate::error::CliError;

pub async fn run_notify(path: Option<&Path>, db_path: &Path) -> Result<(), CliError> {
    let raw = read_payload(path)?;
    let config = load_config()?;
    let engine = open_engine(&config, db_path).await?;

    let report = engine.handle_notification(&raw).await?;
    for line in format_dispatch_lines(&report) {
        println!("{line}");
    }

    // The background drain dies with the process, so finish it here.
    if report.drain_scheduled {
        let drained = engine.retry_failed().await?;
        if drained.attempted > 0 {
            for line in format_drain_lines(&drained) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
