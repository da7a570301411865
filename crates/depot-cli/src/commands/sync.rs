use std::path::Path;

use depot_core::UserType;
use depot_core::sync::{SyncProgress, SyncStatus};
use tokio::sync::watch;

use crate::commands::common::{
    format_drain_lines, format_sync_report_lines, load_config, open_engine, resolve_session,
};
use crate::error::CliError;

pub async fn run_sync(
    user_type: Option<UserType>,
    user_id: Option<i64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let config = load_config()?;
    let session = resolve_session(user_type, user_id, &config)?;
    let engine = open_engine(&config, db_path).await?;

    let drained = engine.on_app_start().await?;
    if drained.attempted > 0 {
        for line in format_drain_lines(&drained) {
            println!("{line}");
        }
    }

    let printer = tokio::spawn(print_progress(engine.orchestrator().subscribe()));
    let stop = engine.orchestrator().stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current page...");
            stop.request_stop();
        }
    });

    let result = engine.start_sync(session).await;
    interrupt.abort();
    printer.abort();
    let report = result?;

    for line in format_sync_report_lines(&report) {
        println!("{line}");
    }

    match (report.status, report.failure) {
        (SyncStatus::Errored, Some(failure)) => Err(CliError::SyncFailed(failure.to_string())),
        (SyncStatus::Errored, None) => Err(CliError::SyncFailed("unknown error".to_string())),
        _ => Ok(()),
    }
}

async fn print_progress(mut progress: watch::Receiver<SyncProgress>) {
    let mut last_table = None;
    while progress.changed().await.is_ok() {
        let snapshot = progress.borrow_and_update().clone();
        if snapshot.current_table.is_none() || snapshot.current_table == last_table {
            continue;
        }
        last_table = snapshot.current_table;
        if let Some(table) = snapshot.current_table {
            eprintln!(
                "[{}/{}] syncing {table}",
                snapshot.completed_tables + 1,
                snapshot.total_tables
            );
        }
    }
}
