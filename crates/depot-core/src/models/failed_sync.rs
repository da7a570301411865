//! Queued single-record refresh failures

use serde::{Deserialize, Serialize};

use super::TableId;

/// A single-record fetch that failed and awaits retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSyncEntry {
    /// Durable queue row identifier
    pub id: i64,
    /// Entity kind of the row to refresh
    pub table_id: TableId,
    /// Server entity id of the row to refresh
    pub data_id: i64,
    /// Time the failure was first queued (Unix ms)
    pub created_at: i64,
    /// Number of failed fetches recorded for this entry
    pub attempts: i64,
    /// Message of the most recent failure
    pub last_error: Option<String>,
}
