//! Sync engine: full-sync orchestrator, notification router and retry queue.

mod detached;
mod engine;
mod failed_queue;
mod locks;
mod orchestrator;
mod role_filter;
mod router;
mod state;
mod status;
mod store;

#[cfg(test)]
mod test_support;

pub use detached::spawn_detached;
pub use engine::SyncEngine;
pub use failed_queue::{DrainReport, FailedSyncQueue};
pub use locks::TableLocks;
pub use orchestrator::{StopHandle, SyncOrchestrator, SyncSession};
pub use role_filter::{PlannedTable, allowed_tables, sync_plan};
pub use router::{BroadcastAction, DispatchReport, NotificationRouter, RefreshOrigin, RefreshOutcome};
pub use state::{SyncState, TableCursor};
pub use status::{SyncFailure, SyncProgress, SyncReport, SyncStatus, TableSyncReport};
pub use store::{FailedSyncStore, LocalStore, SyncTimeLedger};
