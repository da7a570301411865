//! Sequential full-sync state machine.
//!
//! One run walks the role-filtered catalog in master order. For each table it
//! requests pages at an increasing cursor until the server returns an empty
//! page, upserting every non-empty page, and only then records the table's
//! server stamp in the ledger and moves on. At most one page request is in
//! flight. Stop requests are honoured between pages; any fetch or store failure
//! aborts the whole run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use super::locks::TableLocks;
use super::role_filter::sync_plan;
use super::state::SyncState;
use super::status::{SyncFailure, SyncProgress, SyncReport, SyncStatus, TableSyncReport};
use super::store::{LocalStore, SyncTimeLedger};
use crate::catalog::TableDescriptor;
use crate::error::{Error, Result};
use crate::fetch::{BatchFetcher, FetchMode, FullPageRequest};
use crate::models::{TableId, UserType};
use crate::util::normalize_text_option;

/// Who a full sync runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSession {
    pub user_type: UserType,
    pub user_id: i64,
}

/// Cloneable handle that asks the active run to stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum RunEnd {
    Completed,
    Stopped,
}

/// Moves an abandoned run to `Stopped` when `start_sync` is dropped mid-run.
struct RunGuard<'a> {
    progress: &'a watch::Sender<SyncProgress>,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("Full sync cancelled before it finished");
        self.progress.send_modify(|progress| {
            progress.status = SyncStatus::Stopped;
            progress.current_table = None;
        });
    }
}

pub struct SyncOrchestrator {
    fetcher: Arc<dyn BatchFetcher>,
    store: Arc<dyn LocalStore>,
    ledger: Arc<dyn SyncTimeLedger>,
    locks: TableLocks,
    stop: StopHandle,
    progress: watch::Sender<SyncProgress>,
}

impl SyncOrchestrator {
    pub fn new(
        fetcher: Arc<dyn BatchFetcher>,
        store: Arc<dyn LocalStore>,
        ledger: Arc<dyn SyncTimeLedger>,
        locks: TableLocks,
    ) -> Self {
        let (progress, _) = watch::channel(SyncProgress::default());
        Self {
            fetcher,
            store,
            ledger,
            locks,
            stop: StopHandle::default(),
            progress,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.progress.borrow().status
    }

    pub fn progress(&self) -> SyncProgress {
        self.progress.borrow().clone()
    }

    /// Receive every progress update from now on.
    pub fn subscribe(&self) -> watch::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Ask the active run to stop at the next page boundary.
    ///
    /// Returns `false` when no run is active. A page already in flight still
    /// completes and is stored.
    pub fn stop(&self) -> bool {
        if self.status() != SyncStatus::Running {
            return false;
        }
        self.stop.request_stop();
        true
    }

    /// Return a finished run to `Idle`. Returns `false` while a run is active.
    pub fn acknowledge(&self) -> bool {
        let mut acknowledged = false;
        self.progress.send_if_modified(|progress| match progress.status {
            SyncStatus::Running => false,
            SyncStatus::Idle => {
                acknowledged = true;
                false
            }
            _ => {
                acknowledged = true;
                *progress = SyncProgress::default();
                true
            }
        });
        acknowledged
    }

    /// Run one full sync to completion, stop or failure.
    ///
    /// Only accepted from `Idle`. The returned report carries the terminal
    /// status; a failed run is reported, not returned as `Err`.
    pub async fn start_sync(&self, session: SyncSession) -> Result<SyncReport> {
        let plan = sync_plan(session.user_type);
        let eligible = plan
            .iter()
            .filter(|planned| planned.eligible)
            .map(|planned| planned.descriptor)
            .collect::<Vec<_>>();
        let skipped = plan
            .iter()
            .filter(|planned| !planned.eligible)
            .map(|planned| planned.descriptor.table_id)
            .collect::<Vec<_>>();

        let guard = self.begin(eligible.len())?;

        tracing::info!(
            "Full sync started for {} #{} ({} tables, {} skipped by role)",
            session.user_type,
            session.user_id,
            eligible.len(),
            skipped.len()
        );

        let mut state = SyncState::new(eligible.iter().map(|descriptor| descriptor.table_id));
        let mut report = SyncReport {
            status: SyncStatus::Running,
            skipped,
            ..SyncReport::default()
        };

        let outcome = self
            .run(session, &eligible, &mut state, &mut report)
            .await;

        report.status = match outcome {
            Ok(RunEnd::Completed) => {
                tracing::info!("Full sync completed: {} rows", report.rows());
                SyncStatus::Completed
            }
            Ok(RunEnd::Stopped) => {
                tracing::info!(
                    "Full sync stopped after {}/{} tables",
                    state.completed(),
                    state.total()
                );
                SyncStatus::Stopped
            }
            Err((table, error)) => {
                let failure = SyncFailure::new(table, &error);
                tracing::error!("Full sync aborted: {failure}");
                report.failure = Some(failure);
                SyncStatus::Errored
            }
        };

        self.finish(guard, &state, &report);
        Ok(report)
    }

    /// Atomically move `Idle -> Running`.
    fn begin(&self, total_tables: usize) -> Result<RunGuard<'_>> {
        let mut previous = SyncStatus::Idle;
        let started = self.progress.send_if_modified(|progress| {
            previous = progress.status;
            if previous != SyncStatus::Idle {
                return false;
            }
            *progress = SyncProgress {
                status: SyncStatus::Running,
                total_tables,
                ..SyncProgress::default()
            };
            true
        });

        if started {
            self.stop.reset();
            return Ok(RunGuard {
                progress: &self.progress,
                finished: false,
            });
        }
        match previous {
            SyncStatus::Running => Err(Error::SyncInProgress),
            other => Err(Error::SyncNotIdle(other.to_string())),
        }
    }

    fn finish(&self, mut guard: RunGuard<'_>, state: &SyncState, report: &SyncReport) {
        self.progress.send_modify(|progress| {
            progress.status = report.status;
            progress.current_table = None;
            progress.completed_tables = state.completed();
            progress.total_tables = state.total();
            progress.fraction = if report.status == SyncStatus::Completed {
                1.0
            } else {
                state.fraction()
            };
            progress.last_error = report.failure.as_ref().map(ToString::to_string);
        });
        guard.finished = true;
    }

    async fn run(
        &self,
        session: SyncSession,
        tables: &[&'static TableDescriptor],
        state: &mut SyncState,
        report: &mut SyncReport,
    ) -> std::result::Result<RunEnd, (Option<TableId>, Error)> {
        for descriptor in tables {
            let table = descriptor.table_id;
            self.progress.send_modify(|progress| {
                progress.current_table = Some(table);
                progress.completed_tables = state.completed();
                progress.fraction = state.fraction();
            });

            let mut table_report = TableSyncReport {
                table,
                requests: 0,
                rows: 0,
                completed: false,
                update_date: None,
            };
            let outcome = self
                .sync_table(session, descriptor, state, &mut table_report)
                .await;
            report.tables.push(table_report);

            match outcome {
                Ok(true) => {}
                Ok(false) => return Ok(RunEnd::Stopped),
                Err(error) => return Err((Some(table), error)),
            }
        }
        Ok(RunEnd::Completed)
    }

    /// Page through one table. Returns `Ok(false)` when stopped part way.
    async fn sync_table(
        &self,
        session: SyncSession,
        descriptor: &'static TableDescriptor,
        state: &mut SyncState,
        table_report: &mut TableSyncReport,
    ) -> Result<bool> {
        let table = descriptor.table_id;
        let update_date = self.ledger.last_update_date(table).await?;
        let mut latest_stamp: Option<String> = None;

        while !state.is_done(table) {
            if self.stop.is_requested() {
                return Ok(false);
            }

            let part_no = state.part_no(table);
            let mode = FetchMode::Full(FullPageRequest {
                part_no,
                limit: descriptor.page_size,
                user_type: session.user_type,
                user_id: session.user_id,
                update_date: update_date.clone(),
            });

            let page = {
                let _guard = self.locks.acquire(table).await;
                let page = self.fetcher.fetch(descriptor, &mode).await?;
                if !page.is_empty() {
                    self.store.upsert_many(descriptor, &page.records).await?;
                }
                page
            };
            table_report.requests += 1;

            if let Some(stamp) = normalize_text_option(page.server_update_date.clone()) {
                latest_stamp = Some(stamp);
            }

            if page.is_empty() {
                match latest_stamp.as_deref() {
                    Some(stamp) => self.ledger.record_update_date(table, stamp).await?,
                    None => tracing::debug!("{table}: server sent no update date, ledger unchanged"),
                }
                state.observe_empty_page(table);
                table_report.completed = true;
                table_report.update_date = latest_stamp.take();
                tracing::info!(
                    "{table}: synced {} rows in {} requests",
                    table_report.rows,
                    table_report.requests
                );
            } else {
                table_report.rows += page.records.len();
                let next = state.advance(table);
                tracing::debug!(
                    "{table}: page {part_no} stored {} rows, next part {next}",
                    page.records.len()
                );
            }
        }

        Ok(true)
    }
}
