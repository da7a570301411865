//! Shared database service wrapper used across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::catalog::TableDescriptor;
use crate::db::{
    Database, FailedSyncRepository, LibSqlFailedSyncRepository, LibSqlMirrorRepository,
    LibSqlSyncTimeRepository, MirrorRow, SyncTimeRepository,
};
use crate::models::{FailedSyncEntry, Record, SyncTimeEntry, TableId};
use crate::sync::{FailedSyncStore, LocalStore, SyncTimeLedger};
use crate::Result;

/// Thread-safe service for DB and repository operations.
///
/// Every call takes the database mutex, so write batches from the full-sync
/// and notification paths are applied one at a time.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::info!("Local mirror ready at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing file, `None` for in-memory services.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Fetch one mirrored row by server id.
    pub async fn get_mirrored(
        &self,
        table: &TableDescriptor,
        server_id: i64,
    ) -> Result<Option<MirrorRow>> {
        let db = self.db.lock().await;
        let repo = LibSqlMirrorRepository::new(db.connection());
        repo.get(table, server_id).await
    }

    /// List mirrored rows ordered by server id.
    pub async fn list_mirrored(
        &self,
        table: &TableDescriptor,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MirrorRow>> {
        let db = self.db.lock().await;
        let repo = LibSqlMirrorRepository::new(db.connection());
        repo.list(table, limit, offset).await
    }

    /// Number of mirrored rows in a table.
    pub async fn count_mirrored(&self, table: &TableDescriptor) -> Result<i64> {
        let db = self.db.lock().await;
        let repo = LibSqlMirrorRepository::new(db.connection());
        repo.count(table).await
    }

    /// All recorded sync stamps.
    pub async fn list_sync_times(&self) -> Result<Vec<SyncTimeEntry>> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncTimeRepository::new(db.connection());
        repo.list().await
    }
}

#[async_trait]
impl LocalStore for DatabaseService {
    async fn upsert_many(&self, table: &TableDescriptor, records: &[Record]) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlMirrorRepository::new(db.connection());
        repo.upsert_many(table, records).await
    }
}

#[async_trait]
impl SyncTimeLedger for DatabaseService {
    async fn last_update_date(&self, table: TableId) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncTimeRepository::new(db.connection());
        repo.get(table.as_str()).await
    }

    async fn record_update_date(&self, table: TableId, update_date: &str) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncTimeRepository::new(db.connection());
        repo.set(table.as_str(), update_date).await
    }
}

#[async_trait]
impl FailedSyncStore for DatabaseService {
    async fn insert_failed(&self, table: TableId, data_id: i64) -> Result<Option<FailedSyncEntry>> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.insert(table, data_id).await
    }

    async fn failed_entries(&self) -> Result<Vec<FailedSyncEntry>> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.list().await
    }

    async fn remove_failed(&self, id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.delete(id).await
    }

    async fn remove_failed_matching(&self, table: TableId, data_id: i64) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.delete_matching(table, data_id).await
    }

    async fn record_failed_attempt(&self, id: i64, error: &str) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.record_failure(id, error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_upsert_and_count() {
        let service = DatabaseService::open_in_memory().await.unwrap();
        let units = descriptor(TableId::Units).unwrap();

        let record = Record::from_value(json!({"id": 4, "name": "Box"})).unwrap();
        service.upsert_many(units, &[record]).await.unwrap();

        assert_eq!(service.count_mirrored(units).await.unwrap(), 1);
        let row = service.get_mirrored(units, 4).await.unwrap().unwrap();
        assert_eq!(row.label.as_deref(), Some("Box"));
        assert!(service.db_path().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ledger_uses_table_names() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        service
            .record_update_date(TableId::Category, "2024-03-01")
            .await
            .unwrap();

        assert_eq!(
            service
                .last_update_date(TableId::Category)
                .await
                .unwrap()
                .as_deref(),
            Some("2024-03-01")
        );
        assert_eq!(
            service.list_sync_times().await.unwrap()[0].table_name,
            "category"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("depot.db");

        let service = DatabaseService::open_path(&path).await.unwrap();
        service.insert_failed(TableId::Product, 789).await.unwrap();
        drop(service);

        let reopened = DatabaseService::open_path(&path).await.unwrap();
        let entries = reopened.failed_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data_id, 789);
        assert_eq!(reopened.db_path(), Some(path.as_path()));
    }
}
