//! Sync time ledger repository implementation

use crate::error::Result;
use crate::models::SyncTimeEntry;
use libsql::Connection;

/// Trait for per-table sync stamp storage (async)
#[allow(async_fn_in_trait)]
pub trait SyncTimeRepository {
    /// Last recorded server update date for a table
    async fn get(&self, table_name: &str) -> Result<Option<String>>;

    /// Record the server update date for a table, replacing any previous value
    async fn set(&self, table_name: &str, update_date: &str) -> Result<()>;

    /// Every recorded stamp, ordered by table name
    async fn list(&self) -> Result<Vec<SyncTimeEntry>>;
}

/// libSQL implementation of `SyncTimeRepository`
pub struct LibSqlSyncTimeRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncTimeRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SyncTimeRepository for LibSqlSyncTimeRepository<'_> {
    async fn get(&self, table_name: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT update_date FROM sync_time WHERE table_name = ?",
                [table_name],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, table_name: &str, update_date: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_time (table_name, update_date) VALUES (?, ?)
                 ON CONFLICT(table_name) DO UPDATE SET update_date = excluded.update_date",
                [table_name, update_date],
            )
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SyncTimeEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT table_name, update_date FROM sync_time ORDER BY table_name",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(SyncTimeEntry {
                table_name: row.get(0)?,
                last_update_date: row.get(1)?,
            });
        }
        Ok(entries)
    }
}
