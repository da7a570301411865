//! Database layer for Depot

mod connection;
mod failed_sync_repository;
mod migrations;
mod mirror_repository;
mod sync_time_repository;

pub use connection::Database;
pub use failed_sync_repository::{FailedSyncRepository, LibSqlFailedSyncRepository};
pub use mirror_repository::{LibSqlMirrorRepository, MirrorRow};
pub use sync_time_repository::{LibSqlSyncTimeRepository, SyncTimeRepository};
