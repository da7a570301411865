//! Per-table last full-sync stamp

use serde::{Deserialize, Serialize};

/// Server update date recorded after a table's full sync reached an empty page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTimeEntry {
    pub table_name: String,
    pub last_update_date: String,
}
