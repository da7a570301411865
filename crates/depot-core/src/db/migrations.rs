//! Database migrations

use crate::catalog::catalog;
use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// DDL for one mirror table.
///
/// `local_id` is the local surrogate key; `server_id` is the upsert key.
fn mirror_table_statements(table: &str) -> [String; 2] {
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                local_id INTEGER PRIMARY KEY AUTOINCREMENT,
                server_id INTEGER NOT NULL UNIQUE,
                label TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                server_updated_at TEXT,
                payload TEXT NOT NULL,
                synced_at INTEGER NOT NULL
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_active ON {table}(is_active)"),
    ]
}

/// Execute statements atomically, rolling back on the first failure
async fn apply(conn: &Connection, version: i32, statements: &[String]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: mirror tables and sync bookkeeping
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let mut statements = vec![
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
        .to_string(),
        "CREATE TABLE IF NOT EXISTS sync_time (
            table_name TEXT PRIMARY KEY,
            update_date TEXT NOT NULL
        )"
        .to_string(),
        "CREATE TABLE IF NOT EXISTS failed_sync (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            table_id INTEGER NOT NULL,
            data_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )"
        .to_string(),
    ];

    for descriptor in catalog() {
        statements.extend(mirror_table_statements(descriptor.mirror_table));
    }

    apply(conn, 1, &statements).await
}

/// Migration to version 2: de-duplicated retry queue with failure bookkeeping
async fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = [
        "ALTER TABLE failed_sync ADD COLUMN attempts INTEGER NOT NULL DEFAULT 1".to_string(),
        "ALTER TABLE failed_sync ADD COLUMN last_error TEXT".to_string(),
        // Keep the oldest row of every (table_id, data_id) group
        "DELETE FROM failed_sync
         WHERE id NOT IN (SELECT MIN(id) FROM failed_sync GROUP BY table_id, data_id)"
            .to_string(),
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_failed_sync_entity
         ON failed_sync(table_id, data_id)"
            .to_string(),
    ];

    apply(conn, CURRENT_VERSION, &statements).await
}
