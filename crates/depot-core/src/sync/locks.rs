//! Per-table write ordering shared by the full-sync and refresh paths.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::TableId;

/// One async mutex per table.
///
/// A fetch and the upsert of its result happen under the table's lock, so a
/// full-sync page and a single-record refresh of the same table never
/// interleave between fetch and write.
#[derive(Clone)]
pub struct TableLocks {
    locks: Arc<HashMap<TableId, Arc<Mutex<()>>>>,
}

impl Default for TableLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLocks {
    pub fn new() -> Self {
        let locks = TableId::ALL
            .into_iter()
            .map(|table| (table, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            locks: Arc::new(locks),
        }
    }

    /// Wait for exclusive access to `table`.
    pub async fn acquire(&self, table: TableId) -> OwnedMutexGuard<()> {
        // Seeded with every TableId above
        let lock = self.locks.get(&table).cloned().unwrap_or_default();
        lock.lock_owned().await
    }

    /// Whether another task currently holds `table`.
    pub fn is_held(&self, table: TableId) -> bool {
        self.locks
            .get(&table)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
