//! Mirror table repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use libsql::params::Params;
use libsql::{Connection, Row, Value};

use crate::catalog::TableDescriptor;
use crate::error::{Error, Result};
use crate::models::Record;
use crate::util::unix_timestamp_millis;

/// A mirrored server row as stored locally
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorRow {
    /// Local surrogate key, stable across upserts of the same entity
    pub local_id: i64,
    pub server_id: i64,
    pub label: Option<String>,
    pub is_active: bool,
    pub server_updated_at: Option<String>,
    pub record: Record,
    /// Time of the last upsert (Unix ms)
    pub synced_at: i64,
}

/// libSQL repository over the per-table mirror tables
pub struct LibSqlMirrorRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMirrorRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or fully replace `records` in one transaction.
    ///
    /// Rows are keyed on the server id; rows absent from `records` are never
    /// touched. Any failure rolls the whole batch back.
    pub async fn upsert_many(&self, table: &TableDescriptor, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // Shape every row before opening the transaction so a malformed record
        // never leaves a half-written batch behind
        let synced_at = unix_timestamp_millis();
        let rows = records
            .iter()
            .map(|record| shape_row(table, record, synced_at))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!(
            "INSERT INTO {} (server_id, label, is_active, server_updated_at, payload, synced_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(server_id) DO UPDATE SET
                label = excluded.label,
                is_active = excluded.is_active,
                server_updated_at = excluded.server_updated_at,
                payload = excluded.payload,
                synced_at = excluded.synced_at",
            table.mirror_table
        );

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        for row in rows {
            if let Err(e) = self.conn.execute(&sql, Params::Positional(row)).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(records.len())
    }

    /// Get a mirrored row by server id
    pub async fn get(&self, table: &TableDescriptor, server_id: i64) -> Result<Option<MirrorRow>> {
        let sql = format!(
            "SELECT local_id, server_id, label, is_active, server_updated_at, payload, synced_at
             FROM {} WHERE server_id = ?",
            table.mirror_table
        );
        let mut rows = self.conn.query(&sql, [server_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_row(&row)?)),
            None => Ok(None),
        }
    }

    /// List mirrored rows ordered by server id
    pub async fn list(
        &self,
        table: &TableDescriptor,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MirrorRow>> {
        let sql = format!(
            "SELECT local_id, server_id, label, is_active, server_updated_at, payload, synced_at
             FROM {} ORDER BY server_id LIMIT ? OFFSET ?",
            table.mirror_table
        );
        let mut rows = self
            .conn
            .query(&sql, [limit as i64, offset as i64])
            .await?;

        let mut mirrored = Vec::new();
        while let Some(row) = rows.next().await? {
            mirrored.push(parse_row(&row)?);
        }
        Ok(mirrored)
    }

    /// Number of mirrored rows
    pub async fn count(&self, table: &TableDescriptor) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.mirror_table);
        let mut rows = self.conn.query(&sql, ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}

fn shape_row(table: &TableDescriptor, record: &Record, synced_at: i64) -> Result<Vec<Value>> {
    let server_id = record.server_id().map_err(|error| {
        Error::InvalidRecord(format!("{} row rejected: {error}", table.name()))
    })?;

    Ok(vec![
        Value::Integer(server_id),
        record.text(table.label_field).map_or(Value::Null, Value::Text),
        Value::Integer(i64::from(record.is_active())),
        record.updated_at().map_or(Value::Null, Value::Text),
        Value::Text(record.to_json()?),
        Value::Integer(synced_at),
    ])
}

fn parse_row(row: &Row) -> Result<MirrorRow> {
    let server_id: i64 = row.get(1)?;
    let payload: String = row.get(5)?;
    let record = serde_json::from_str(&payload).map_err(|error| {
        Error::Database(format!("corrupt payload for server id {server_id}: {error}"))
    })?;
    Ok(MirrorRow {
        local_id: row.get(0)?,
        server_id,
        label: optional_text(row, 2)?,
        is_active: row.get::<i64>(3)? != 0,
        server_updated_at: optional_text(row, 4)?,
        record,
        synced_at: row.get(6)?,
    })
}

fn optional_text(row: &Row, index: i32) -> Result<Option<String>> {
    match row.get_value(index)? {
        Value::Text(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}
