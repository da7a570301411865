//! Observable orchestrator state.

use std::fmt;

use crate::error::{Error, FailureKind};
use crate::models::TableId;

/// Lifecycle of the full-sync orchestrator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
    Errored,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Errored => "errored",
        }
    }

    /// Completed, stopped and errored runs wait for acknowledgement.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Errored)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published to progress subscribers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncProgress {
    pub status: SyncStatus,
    /// Table being processed, `None` between runs
    pub current_table: Option<TableId>,
    pub completed_tables: usize,
    pub total_tables: usize,
    /// `completed_tables / total_tables`, `1.0` once a run completes
    pub fraction: f64,
    pub last_error: Option<String>,
}

/// Why a run ended in [`SyncStatus::Errored`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncFailure {
    pub table: Option<TableId>,
    pub kind: FailureKind,
    pub message: String,
}

impl SyncFailure {
    pub fn new(table: Option<TableId>, error: &Error) -> Self {
        Self {
            table,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table {
            Some(table) => write!(f, "{table}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Per-table outcome of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSyncReport {
    pub table: TableId,
    /// Page requests issued, including the final empty one
    pub requests: u32,
    pub rows: usize,
    pub completed: bool,
    /// Stamp written to the ledger, if any
    pub update_date: Option<String>,
}

/// Outcome of one `start_sync` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Eligible tables in the order they were processed
    pub tables: Vec<TableSyncReport>,
    /// Tables outside the role filter, never fetched
    pub skipped: Vec<TableId>,
    pub failure: Option<SyncFailure>,
}

impl SyncReport {
    pub fn rows(&self) -> usize {
        self.tables.iter().map(|table| table.rows).sum()
    }

    pub fn table(&self, table: TableId) -> Option<&TableSyncReport> {
        self.tables.iter().find(|report| report.table == table)
    }
}
