//! Failed single-record refresh queue repository

use crate::error::Result;
use crate::models::{FailedSyncEntry, TableId};
use crate::util::unix_timestamp_millis;
use libsql::{Connection, Row, Value};

/// Trait for the durable retry queue (async)
#[allow(async_fn_in_trait)]
pub trait FailedSyncRepository {
    /// Queue a failed refresh. Returns `None` when the entity is already queued.
    async fn insert(&self, table_id: TableId, data_id: i64) -> Result<Option<FailedSyncEntry>>;

    /// All queued entries, oldest first
    async fn list(&self) -> Result<Vec<FailedSyncEntry>>;

    /// Remove one entry by queue id
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Remove every entry for an entity
    async fn delete_matching(&self, table_id: TableId, data_id: i64) -> Result<u64>;

    /// Bump the attempt counter and remember the latest error
    async fn record_failure(&self, id: i64, error: &str) -> Result<()>;
}

/// libSQL implementation of `FailedSyncRepository`
pub struct LibSqlFailedSyncRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlFailedSyncRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn count(&self) -> Result<i64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM failed_sync", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

impl FailedSyncRepository for LibSqlFailedSyncRepository<'_> {
    async fn insert(&self, table_id: TableId, data_id: i64) -> Result<Option<FailedSyncEntry>> {
        let created_at = unix_timestamp_millis();
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO failed_sync (table_id, data_id, created_at, attempts)
                 VALUES (?, ?, ?, 1)",
                [i64::from(table_id), data_id, created_at],
            )
            .await?;

        if inserted == 0 {
            return Ok(None);
        }

        Ok(Some(FailedSyncEntry {
            id: self.conn.last_insert_rowid(),
            table_id,
            data_id,
            created_at,
            attempts: 1,
            last_error: None,
        }))
    }

    async fn list(&self) -> Result<Vec<FailedSyncEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, table_id, data_id, created_at, attempts, last_error
                 FROM failed_sync ORDER BY id",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            match parse_entry(&row) {
                Ok(entry) => entries.push(entry),
                Err(error) => tracing::warn!("Skipping unreadable failed_sync row: {error}"),
            }
        }
        Ok(entries)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM failed_sync WHERE id = ?", [id])
            .await?;
        Ok(deleted > 0)
    }

    async fn delete_matching(&self, table_id: TableId, data_id: i64) -> Result<u64> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM failed_sync WHERE table_id = ? AND data_id = ?",
                [i64::from(table_id), data_id],
            )
            .await?;
        if deleted > 0 {
            tracing::debug!(
                "Cleared {deleted} queued refresh(es) for {table_id}#{data_id}; {} left",
                self.count().await?
            );
        }
        Ok(deleted)
    }

    async fn record_failure(&self, id: i64, error: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE failed_sync SET attempts = attempts + 1, last_error = ? WHERE id = ?",
                libsql::params![error, id],
            )
            .await?;
        Ok(())
    }
}

fn parse_entry(row: &Row) -> Result<FailedSyncEntry> {
    let table_id = TableId::try_from(row.get::<i64>(1)?)?;
    let last_error = match row.get_value(5)? {
        Value::Text(text) => Some(text),
        _ => None,
    };

    Ok(FailedSyncEntry {
        id: row.get(0)?,
        table_id,
        data_id: row.get(2)?,
        created_at: row.get(3)?,
        attempts: row.get(4)?,
        last_error,
    })
}
