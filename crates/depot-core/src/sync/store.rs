//! Persistence seams used by the sync engine.
//!
//! The engine only talks to these traits; [`crate::DatabaseService`]
//! implements all three over the local libSQL mirror.

use async_trait::async_trait;

use crate::catalog::TableDescriptor;
use crate::error::Result;
use crate::models::{FailedSyncEntry, Record, TableId};

/// Idempotent per-table upsert layer keyed by server entity id.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Write one batch atomically; returns the number of rows written.
    async fn upsert_many(&self, table: &TableDescriptor, records: &[Record]) -> Result<usize>;
}

/// Per-table server stamp of the last completed full sync.
#[async_trait]
pub trait SyncTimeLedger: Send + Sync {
    async fn last_update_date(&self, table: TableId) -> Result<Option<String>>;

    async fn record_update_date(&self, table: TableId, update_date: &str) -> Result<()>;
}

/// Durable storage behind the failed-sync queue.
#[async_trait]
pub trait FailedSyncStore: Send + Sync {
    /// Returns `None` when the entity is already queued.
    async fn insert_failed(&self, table: TableId, data_id: i64) -> Result<Option<FailedSyncEntry>>;

    async fn failed_entries(&self) -> Result<Vec<FailedSyncEntry>>;

    async fn remove_failed(&self, id: i64) -> Result<bool>;

    async fn remove_failed_matching(&self, table: TableId, data_id: i64) -> Result<u64>;

    async fn record_failed_attempt(&self, id: i64, error: &str) -> Result<()>;
}
