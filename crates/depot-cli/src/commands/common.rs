use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use depot_core::models::{FailedSyncEntry, SyncTimeEntry};
use depot_core::sync::{
    BroadcastAction, DispatchReport, DrainReport, PlannedTable, SyncReport, SyncSession,
};
use depot_core::{
    ClientConfig, DatabaseService, HttpBatchFetcher, SyncEngine, TableDescriptor, UserType,
};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct FailedSyncItem {
    pub id: i64,
    pub table: String,
    pub table_id: i64,
    pub data_id: i64,
    pub created_at: i64,
    pub created_at_iso: String,
    pub attempts: i64,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TableStatusItem {
    pub table: String,
    pub table_id: i64,
    pub rows: i64,
    pub last_update_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlannedTableItem {
    pub table: String,
    pub table_id: i64,
    pub endpoint: String,
    pub eligible: bool,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("DEPOT_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depot")
        .join("depot.db")
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path).await?)
}

pub fn load_config() -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::from_env()?)
}

/// Engine over the database at `db_path` talking to the configured server.
pub async fn open_engine(config: &ClientConfig, db_path: &Path) -> Result<SyncEngine, CliError> {
    let database = open_database(db_path).await?;
    let fetcher = HttpBatchFetcher::new(config)?;
    tracing::debug!("Using download API at {}", fetcher.base_url());
    Ok(SyncEngine::new(database, Arc::new(fetcher)))
}

/// Command-line values win over the configured session defaults.
pub fn resolve_session(
    user_type: Option<UserType>,
    user_id: Option<i64>,
    config: &ClientConfig,
) -> Result<SyncSession, CliError> {
    let user_type = user_type
        .or(config.user_type)
        .ok_or(CliError::MissingUserType)?;
    let user_id = user_id.or(config.user_id).ok_or(CliError::MissingUserId)?;
    Ok(SyncSession { user_type, user_id })
}

/// Payload text from `path`, or from piped stdin when no path is given.
pub fn read_payload(path: Option<&Path>) -> Result<String, CliError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => read_piped_stdin()?.unwrap_or_default(),
    };
    normalize_payload(&raw).ok_or(CliError::EmptyPayload)
}

pub fn normalize_payload(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(Some(buffer))
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn failed_entry_to_item(entry: &FailedSyncEntry) -> FailedSyncItem {
    FailedSyncItem {
        id: entry.id,
        table: entry.table_id.to_string(),
        table_id: entry.table_id.code(),
        data_id: entry.data_id,
        created_at: entry.created_at,
        created_at_iso: format_timestamp(entry.created_at),
        attempts: entry.attempts,
        last_error: entry.last_error.clone(),
    }
}

pub fn format_failed_lines(entries: &[FailedSyncEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let line = format!(
                "#{:<5} {:<18} id={:<8} attempts={}  since {}",
                entry.id,
                entry.table_id.as_str(),
                entry.data_id,
                entry.attempts,
                format_timestamp(entry.created_at)
            );
            match entry.last_error.as_deref() {
                Some(error) => format!("{line}  ({error})"),
                None => line,
            }
        })
        .collect()
}

pub fn table_status_item(
    descriptor: &TableDescriptor,
    rows: i64,
    stamps: &[SyncTimeEntry],
) -> TableStatusItem {
    TableStatusItem {
        table: descriptor.name().to_string(),
        table_id: descriptor.table_id.code(),
        rows,
        last_update_date: stamps
            .iter()
            .find(|entry| entry.table_name == descriptor.name())
            .map(|entry| entry.last_update_date.clone()),
    }
}

pub fn format_status_lines(items: &[TableStatusItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let stamp = item.last_update_date.as_deref().unwrap_or("never");
            format!("{:<18} {:>8} rows  last sync {stamp}", item.table, item.rows)
        })
        .collect()
}

pub fn planned_table_to_item(planned: &PlannedTable) -> PlannedTableItem {
    PlannedTableItem {
        table: planned.descriptor.name().to_string(),
        table_id: planned.descriptor.table_id.code(),
        endpoint: planned.descriptor.endpoint.to_string(),
        eligible: planned.eligible,
    }
}

pub fn format_plan_lines(plan: &[PlannedTable]) -> Vec<String> {
    plan.iter()
        .map(|planned| {
            let marker = if planned.eligible { "sync" } else { "skip" };
            format!(
                "{marker}  {:<18} /{}",
                planned.descriptor.name(),
                planned.descriptor.endpoint
            )
        })
        .collect()
}

pub fn format_drain_lines(report: &DrainReport) -> Vec<String> {
    if report.attempted == 0 {
        return vec!["Retry queue is empty.".to_string()];
    }

    let mut lines = vec![format!(
        "Retried {} queued refresh(es): {} recovered, {} still failing",
        report.attempted,
        report.recovered.len(),
        report.still_failing.len()
    )];
    lines.extend(
        report
            .still_failing
            .iter()
            .map(|(table, id)| format!("  still failing: {table}#{id}")),
    );
    lines.extend(
        report
            .dropped
            .iter()
            .map(|(table, id)| format!("  dropped: {table}#{id}")),
    );
    lines
}

pub fn format_dispatch_lines(report: &DispatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Refreshed {}, queued {}, failed {}, skipped {}",
        report.refreshed.len(),
        report.queued.len(),
        report.failed.len(),
        report.skipped.len()
    )];
    if !report.malformed.is_empty() {
        lines.push(format!(
            "Ignored {} malformed reference(s)",
            report.malformed.len()
        ));
    }
    for action in &report.actions {
        match action {
            BroadcastAction::ForceLogout => lines.push("Action: force logout".to_string()),
        }
    }
    if report.show_notification && !report.message.is_empty() {
        lines.push(format!("Message: {}", report.message));
    }
    lines
}

pub fn format_sync_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = report
        .tables
        .iter()
        .map(|table| {
            let state = if table.completed { "done" } else { "partial" };
            format!(
                "{:<18} {:>8} rows  {:>3} request(s)  {state}",
                table.table.as_str(),
                table.rows,
                table.requests
            )
        })
        .collect::<Vec<_>>();
    lines.push(format!(
        "Sync {}: {} rows across {} table(s), {} skipped by role",
        report.status,
        report.rows(),
        report.tables.len(),
        report.skipped.len()
    ));
    if let Some(failure) = report.failure.as_ref() {
        lines.push(format!("Failure: {failure}"));
    }
    lines
}
