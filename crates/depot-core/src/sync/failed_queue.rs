//! Durable queue of single-record refreshes awaiting retry.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::router::{NotificationRouter, RefreshOrigin, RefreshOutcome};
use super::store::FailedSyncStore;
use crate::catalog::descriptor;
use crate::error::Result;
use crate::models::{FailedSyncEntry, TableId};

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries loaded at the start of the pass
    pub attempted: usize,
    pub recovered: Vec<(TableId, i64)>,
    pub still_failing: Vec<(TableId, i64)>,
    /// Entries naming a table that can never be refreshed
    pub dropped: Vec<(TableId, i64)>,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.still_failing.is_empty()
    }
}

/// Shared handle over the persisted retry queue.
///
/// Drains are serialized: at most one load-retry-delete cycle runs at a time.
#[derive(Clone)]
pub struct FailedSyncQueue {
    store: Arc<dyn FailedSyncStore>,
    drain_lock: Arc<Mutex<()>>,
}

impl FailedSyncQueue {
    pub fn new(store: Arc<dyn FailedSyncStore>) -> Self {
        Self {
            store,
            drain_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Queue a failed refresh. Returns `None` when the entity is already queued.
    pub async fn enqueue(&self, table: TableId, data_id: i64) -> Result<Option<FailedSyncEntry>> {
        let entry = self.store.insert_failed(table, data_id).await?;
        match &entry {
            Some(entry) => tracing::info!("Queued {table}#{data_id} for retry (entry {})", entry.id),
            None => tracing::debug!("{table}#{data_id} is already queued for retry"),
        }
        Ok(entry)
    }

    pub async fn entries(&self) -> Result<Vec<FailedSyncEntry>> {
        self.store.failed_entries().await
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.store.failed_entries().await?.len())
    }

    /// Clear every queued entry for an entity after a successful refresh.
    pub(crate) async fn resolve(&self, table: TableId, data_id: i64) -> Result<u64> {
        self.store.remove_failed_matching(table, data_id).await
    }

    pub(crate) async fn record_attempt(&self, entry: &FailedSyncEntry, error: &str) -> Result<()> {
        self.store.record_failed_attempt(entry.id, error).await
    }

    /// Retry every queued entry, waiting for any drain already in progress.
    pub async fn drain(&self, router: &NotificationRouter) -> Result<DrainReport> {
        let _guard = self.drain_lock.lock().await;
        self.drain_locked(router).await
    }

    /// Like [`Self::drain`], but returns `None` at once if another drain is running.
    pub async fn try_drain(&self, router: &NotificationRouter) -> Result<Option<DrainReport>> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            tracing::debug!("Retry queue drain already running; skipping");
            return Ok(None);
        };
        self.drain_locked(router).await.map(Some)
    }

    async fn drain_locked(&self, router: &NotificationRouter) -> Result<DrainReport> {
        let entries = self.store.failed_entries().await?;
        let mut report = DrainReport {
            attempted: entries.len(),
            ..DrainReport::default()
        };
        if entries.is_empty() {
            return Ok(report);
        }
        tracing::info!("Retrying {} queued refresh(es)", entries.len());

        for entry in entries {
            let key = (entry.table_id, entry.data_id);
            if descriptor(entry.table_id).is_none() {
                tracing::warn!(
                    "Dropping queued refresh for non-synchronized table {}",
                    entry.table_id
                );
                self.store.remove_failed(entry.id).await?;
                report.dropped.push(key);
                continue;
            }

            match router
                .refresh(entry.table_id, entry.data_id, RefreshOrigin::Retry(entry))
                .await
            {
                RefreshOutcome::Refreshed { .. } => report.recovered.push(key),
                _ => report.still_failing.push(key),
            }
        }

        tracing::info!(
            "Retry drain finished: {} recovered, {} still failing",
            report.recovered.len(),
            report.still_failing.len()
        );
        Ok(report)
    }
}
