//! Push-notification driven single-record refresh.
//!
//! Every `(table, id)` in a payload is refreshed on its own: fetched, upserted,
//! and on failure queued for retry. This path does not wait for, or interfere
//! with, a running full sync beyond sharing its per-table locks.

use std::sync::Arc;

use super::detached::spawn_detached;
use super::failed_queue::FailedSyncQueue;
use super::locks::TableLocks;
use super::store::LocalStore;
use crate::catalog::descriptor;
use crate::error::{Error, Result};
use crate::fetch::{BatchFetcher, FetchMode};
use crate::models::{DataRef, FailedSyncEntry, NotificationPayload, TableId};

/// Why a single-record refresh runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOrigin {
    /// First attempt, straight from a push payload
    Notification,
    /// Re-run of a queued entry
    Retry(FailedSyncEntry),
}

/// Result of one single-record refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { rows: usize },
    /// First failure; `entry_id` is `None` when the entity was already queued
    Queued { entry_id: Option<i64>, error: String },
    /// Retry failed; the queued entry stays in place
    StillQueued { entry_id: i64, error: String },
    /// Could not be fetched nor queued
    Failed { error: String },
}

/// Actions a payload asks for instead of a data refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastAction {
    ForceLogout,
}

/// What one payload dispatch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub refreshed: Vec<DataRef>,
    pub queued: Vec<DataRef>,
    pub failed: Vec<DataRef>,
    /// Unknown tables and references that cannot be refreshed
    pub skipped: Vec<DataRef>,
    /// `data_ids` entries that could not be decoded, as compact JSON
    pub malformed: Vec<String>,
    pub actions: Vec<BroadcastAction>,
    /// Passed through for the UI layer
    pub show_notification: bool,
    pub message: String,
    /// A background retry-queue drain was started
    pub drain_scheduled: bool,
}

#[derive(Clone)]
pub struct NotificationRouter {
    fetcher: Arc<dyn BatchFetcher>,
    store: Arc<dyn LocalStore>,
    queue: FailedSyncQueue,
    locks: TableLocks,
    drain_after_refresh: bool,
}

impl NotificationRouter {
    pub fn new(
        fetcher: Arc<dyn BatchFetcher>,
        store: Arc<dyn LocalStore>,
        queue: FailedSyncQueue,
        locks: TableLocks,
    ) -> Self {
        Self {
            fetcher,
            store,
            queue,
            locks,
            drain_after_refresh: true,
        }
    }

    /// Whether a successful dispatch starts a background drain of the retry queue.
    #[must_use]
    pub fn with_drain_after_refresh(mut self, enabled: bool) -> Self {
        self.drain_after_refresh = enabled;
        self
    }

    pub const fn queue(&self) -> &FailedSyncQueue {
        &self.queue
    }

    /// Decode and dispatch a raw payload.
    pub async fn dispatch_json(&self, raw: &str) -> Result<DispatchReport> {
        let payload = NotificationPayload::from_json(raw)?;
        Ok(self.dispatch(&payload).await)
    }

    /// Refresh every row a payload names. Individual failures are reported, never returned.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> DispatchReport {
        let mut report = DispatchReport {
            show_notification: payload.data.show_notification,
            message: payload.data.message.clone(),
            malformed: payload.data.malformed.clone(),
            ..DispatchReport::default()
        };
        for entry in &report.malformed {
            tracing::warn!("Ignoring malformed refresh reference {entry}");
        }

        for data_ref in &payload.data.data_ids {
            let Ok(table) = TableId::try_from(data_ref.table) else {
                tracing::warn!("Ignoring refresh for unknown table {}", data_ref.table);
                report.skipped.push(*data_ref);
                continue;
            };

            if table.is_action() {
                if table == TableId::Logout && data_ref.id == 0 {
                    tracing::info!("Payload requests a forced logout");
                    report.actions.push(BroadcastAction::ForceLogout);
                } else {
                    tracing::warn!("Ignoring {table} action for id {}", data_ref.id);
                    report.skipped.push(*data_ref);
                }
                continue;
            }

            match self
                .refresh(table, data_ref.id, RefreshOrigin::Notification)
                .await
            {
                RefreshOutcome::Refreshed { .. } => report.refreshed.push(*data_ref),
                RefreshOutcome::Queued { .. } | RefreshOutcome::StillQueued { .. } => {
                    report.queued.push(*data_ref);
                }
                RefreshOutcome::Failed { .. } => report.failed.push(*data_ref),
            }
        }

        if self.drain_after_refresh && !report.refreshed.is_empty() {
            let router = self.clone();
            spawn_detached("retry-queue-drain", async move {
                router.queue.try_drain(&router).await
            });
            report.drain_scheduled = true;
        }

        report
    }

    /// Fetch one entity and upsert it, tracking failures in the retry queue.
    pub async fn refresh(&self, table: TableId, id: i64, origin: RefreshOrigin) -> RefreshOutcome {
        match self.fetch_and_store(table, id).await {
            Ok(rows) => {
                if let Err(error) = self.queue.resolve(table, id).await {
                    tracing::warn!("Refreshed {table}#{id} but could not clear its queue entry: {error}");
                }
                tracing::debug!("Refreshed {table}#{id} ({rows} row(s))");
                RefreshOutcome::Refreshed { rows }
            }
            Err(error) => self.handle_failure(table, id, origin, &error).await,
        }
    }

    async fn fetch_and_store(&self, table: TableId, id: i64) -> Result<usize> {
        let descriptor = descriptor(table)
            .ok_or_else(|| Error::InvalidInput(format!("{table} is not a synchronized table")))?;

        let _guard = self.locks.acquire(table).await;
        let page = self
            .fetcher
            .fetch(descriptor, &FetchMode::Single { id })
            .await?;
        if page.is_empty() {
            tracing::debug!("Server returned nothing for {table}#{id}");
            return Ok(0);
        }
        self.store.upsert_many(descriptor, &page.records).await
    }

    async fn handle_failure(
        &self,
        table: TableId,
        id: i64,
        origin: RefreshOrigin,
        error: &Error,
    ) -> RefreshOutcome {
        let message = error.to_string();
        match origin {
            RefreshOrigin::Notification => {
                tracing::warn!("Refresh of {table}#{id} failed: {message}");
                match self.queue.enqueue(table, id).await {
                    Ok(entry) => RefreshOutcome::Queued {
                        entry_id: entry.map(|entry| entry.id),
                        error: message,
                    },
                    Err(queue_error) => {
                        tracing::error!("Could not queue {table}#{id} for retry: {queue_error}");
                        RefreshOutcome::Failed {
                            error: format!("{message}; not queued: {queue_error}"),
                        }
                    }
                }
            }
            RefreshOrigin::Retry(entry) => {
                tracing::debug!("Retry of {table}#{id} failed again: {message}");
                if let Err(record_error) = self.queue.record_attempt(&entry, &message).await {
                    tracing::warn!("Could not record retry attempt for {table}#{id}: {record_error}");
                }
                RefreshOutcome::StillQueued {
                    entry_id: entry.id,
                    error: message,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::DatabaseService;
    use crate::sync::test_support::{ScriptedFetcher, rows};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        fetcher: Arc<ScriptedFetcher>,
        database: DatabaseService,
        locks: TableLocks,
        router: NotificationRouter,
    }

    async fn harness(drain_after_refresh: bool) -> Harness {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let database = DatabaseService::open_in_memory().await.unwrap();
        let locks = TableLocks::new();
        let router = NotificationRouter::new(
            fetcher.clone(),
            Arc::new(database.clone()),
            FailedSyncQueue::new(Arc::new(database.clone())),
            locks.clone(),
        )
        .with_drain_after_refresh(drain_after_refresh);
        Harness {
            fetcher,
            database,
            locks,
            router,
        }
    }

    fn payload(refs: &[(i64, i64)]) -> NotificationPayload {
        let data_ids = refs
            .iter()
            .map(|(table, id)| json!({"table": table, "id": id}))
            .collect::<Vec<_>>();
        serde_json::from_value(json!({
            "ids": [{"user_id": 1, "silent_push": 0}],
            "data_message": "",
            "data": {"data_ids": data_ids, "show_notification": "1", "message": "updated"}
        }))
        .unwrap()
    }

    fn products() -> &'static crate::catalog::TableDescriptor {
        descriptor(TableId::Product).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_refresh_is_queued_and_recovered_by_drain() {
        let h = harness(false).await;
        h.fetcher.set_rows(TableId::Product, rows(800));
        h.fetcher.fail_single(TableId::Product, 789);

        let report = h.router.dispatch(&payload(&[(1, 789)])).await;
        assert_eq!(report.queued, vec![DataRef { table: 1, id: 789 }]);
        assert!(report.refreshed.is_empty());

        let entries = h.router.queue().entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].table_id, entries[0].data_id), (TableId::Product, 789));
        assert!(h.database.get_mirrored(products(), 789).await.unwrap().is_none());

        h.fetcher.heal_single(TableId::Product, 789);
        let drained = h.router.queue().drain(&h.router).await.unwrap();

        assert_eq!(drained.recovered, vec![(TableId::Product, 789)]);
        assert!(h.router.queue().entries().await.unwrap().is_empty());
        let row = h.database.get_mirrored(products(), 789).await.unwrap().unwrap();
        assert_eq!(row.label.as_deref(), Some("row 789"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refs_are_processed_independently() {
        let h = harness(false).await;
        h.fetcher.set_rows(TableId::Product, rows(10));
        h.fetcher.set_rows(TableId::Category, rows(3));
        h.fetcher.fail_single(TableId::Product, 2);

        let report = h.router.dispatch(&payload(&[(1, 2), (6, 3), (1, 5)])).await;

        assert_eq!(
            report.refreshed,
            vec![DataRef { table: 6, id: 3 }, DataRef { table: 1, id: 5 }]
        );
        assert_eq!(report.queued, vec![DataRef { table: 1, id: 2 }]);
        assert_eq!(h.router.queue().len().await.unwrap(), 1);
        assert!(h.database.get_mirrored(products(), 5).await.unwrap().is_some());
        assert!(!report.drain_scheduled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeated_failures_do_not_duplicate_entries() {
        let h = harness(false).await;
        h.fetcher.fail_single(TableId::Orders, 12);

        h.router.dispatch(&payload(&[(8, 12)])).await;
        let second = h
            .router
            .refresh(TableId::Orders, 12, RefreshOrigin::Notification)
            .await;

        assert!(matches!(second, RefreshOutcome::Queued { entry_id: None, .. }));
        assert_eq!(h.router.queue().len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn any_successful_refresh_clears_the_queue_entry() {
        let h = harness(false).await;
        h.fetcher.set_rows(TableId::Racks, rows(4));
        h.router.queue().enqueue(TableId::Racks, 4).await.unwrap();

        let report = h.router.dispatch(&payload(&[(18, 4)])).await;

        assert_eq!(report.refreshed, vec![DataRef { table: 18, id: 4 }]);
        assert_eq!(h.router.queue().len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn logout_and_unknown_tables_are_not_fetched() {
        let h = harness(false).await;

        let report = h.router.dispatch(&payload(&[(22, 0), (22, 9), (99, 1)])).await;

        assert_eq!(report.actions, vec![BroadcastAction::ForceLogout]);
        assert_eq!(
            report.skipped,
            vec![DataRef { table: 22, id: 9 }, DataRef { table: 99, id: 1 }]
        );
        assert!(h.fetcher.single_calls().is_empty());
        assert_eq!(report.message, "updated");
        assert!(report.show_notification);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn successful_refresh_drains_siblings_in_background() {
        let h = harness(true).await;
        h.fetcher.set_rows(TableId::Product, rows(10));
        h.router.queue().enqueue(TableId::Product, 7).await.unwrap();

        let report = h.router.dispatch(&payload(&[(1, 1)])).await;
        assert!(report.drain_scheduled);

        tokio::time::timeout(Duration::from_secs(5), async {
            while h.router.queue().len().await.unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert!(h.database.get_mirrored(products(), 7).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn background_drain_failure_does_not_affect_dispatch() {
        let h = harness(true).await;
        h.fetcher.set_rows(TableId::Product, rows(10));
        h.fetcher.fail_single(TableId::Product, 7);
        h.router.queue().enqueue(TableId::Product, 7).await.unwrap();

        let report = h.router.dispatch(&payload(&[(1, 1)])).await;

        assert_eq!(report.refreshed, vec![DataRef { table: 1, id: 1 }]);
        assert!(report.failed.is_empty());
        tokio::time::timeout(Duration::from_secs(5), async {
            while h.router.queue().entries().await.unwrap()[0].attempts < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(h.router.queue().len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refresh_waits_for_the_table_lock() {
        let h = harness(false).await;
        h.fetcher.set_rows(TableId::Product, rows(3));
        let guard = h.locks.acquire(TableId::Product).await;

        let router = h.router.clone();
        let pending = tokio::spawn(async move {
            router
                .refresh(TableId::Product, 3, RefreshOrigin::Notification)
                .await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(h.fetcher.single_calls().is_empty());

        drop(guard);
        let outcome = pending.await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { rows: 1 });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn notification_refresh_replaces_full_sync_row() {
        let h = harness(false).await;
        h.fetcher.set_rows(TableId::Product, rows(2));
        h.database
            .upsert_many(products(), &rows(2))
            .await
            .unwrap();
        h.fetcher.upsert_row(
            TableId::Product,
            crate::models::Record::from_value(json!({"id": 2, "name": "renamed"})).unwrap(),
        );

        h.router.dispatch(&payload(&[(1, 2)])).await;

        let row = h.database.get_mirrored(products(), 2).await.unwrap().unwrap();
        assert_eq!(row.label.as_deref(), Some("renamed"));
        assert_eq!(h.database.count_mirrored(products()).await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_reference_does_not_block_valid_siblings() {
        let h = harness(false).await;
        h.fetcher.set_rows(TableId::Product, rows(800));

        let report = h
            .router
            .dispatch_json(
                r#"{"data": {"data_ids": [{"table": 1, "id": "abc"}, {"table": 1, "id": 789}]}}"#,
            )
            .await
            .unwrap();

        assert_eq!(report.refreshed, vec![DataRef { table: 1, id: 789 }]);
        assert_eq!(report.malformed.len(), 1);
        assert_eq!(h.fetcher.single_calls(), vec![(TableId::Product, 789)]);
        assert!(h.database.get_mirrored(products(), 789).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_json_rejects_malformed_payloads() {
        let h = harness(false).await;
        let error = h.router.dispatch_json("{not json").await.unwrap_err();
        assert!(matches!(error, Error::InvalidPayload(_)));
    }
}
