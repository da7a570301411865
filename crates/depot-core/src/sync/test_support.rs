//! Scripted collaborators for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use super::orchestrator::StopHandle;
use super::store::LocalStore;
use crate::catalog::TableDescriptor;
use crate::error::{Error, Result};
use crate::fetch::{BatchFetcher, FetchMode, FullPageRequest, Page};
use crate::models::{Record, TableId};
use crate::services::DatabaseService;

/// `count` records with ids `1..=count`.
pub fn rows(count: usize) -> Vec<Record> {
    (1..=count)
        .map(|id| Record::from_value(json!({"id": id, "name": format!("row {id}")})).unwrap())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FailPoint {
    Page(TableId, u32),
    Single(TableId, i64),
}

/// In-memory download API with call recording and failure injection.
pub struct ScriptedFetcher {
    data: Mutex<HashMap<TableId, Vec<Record>>>,
    update_dates: Mutex<HashMap<TableId, String>>,
    failures: Mutex<HashSet<FailPoint>>,
    calls: Mutex<Vec<(TableId, FetchMode, usize)>>,
    stop_after: Mutex<Option<(usize, StopHandle)>>,
    gate: watch::Sender<bool>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            data: Mutex::default(),
            update_dates: Mutex::default(),
            failures: Mutex::default(),
            calls: Mutex::default(),
            stop_after: Mutex::default(),
            gate,
        }
    }

    pub fn set_rows(&self, table: TableId, records: Vec<Record>) {
        self.data.lock().unwrap().insert(table, records);
    }

    pub fn upsert_row(&self, table: TableId, record: Record) {
        let id = record.server_id().unwrap();
        let mut data = self.data.lock().unwrap();
        let rows = data.entry(table).or_default();
        rows.retain(|row| row.server_id().unwrap() != id);
        rows.push(record);
    }

    pub fn set_update_date(&self, table: TableId, update_date: &str) {
        self.update_dates
            .lock()
            .unwrap()
            .insert(table, update_date.to_string());
    }

    pub fn fail_full_page(&self, table: TableId, part_no: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(FailPoint::Page(table, part_no));
    }

    pub fn fail_single(&self, table: TableId, id: i64) {
        self.failures
            .lock()
            .unwrap()
            .insert(FailPoint::Single(table, id));
    }

    pub fn heal_single(&self, table: TableId, id: i64) {
        self.failures
            .lock()
            .unwrap()
            .remove(&FailPoint::Single(table, id));
    }

    /// Request a stop from inside the `count`-th fetch, once.
    pub fn stop_after(&self, count: usize, handle: StopHandle) {
        *self.stop_after.lock().unwrap() = Some((count, handle));
    }

    /// Block every fetch until [`Self::open_gate`].
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Full-page requests in issue order.
    pub fn full_calls(&self) -> Vec<(TableId, FullPageRequest)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(table, mode, _)| match mode {
                FetchMode::Full(request) => Some((*table, request.clone())),
                FetchMode::Single { .. } => None,
            })
            .collect()
    }

    pub fn full_parts(&self, table: TableId) -> Vec<u32> {
        self.full_calls()
            .into_iter()
            .filter(|(called, _)| *called == table)
            .map(|(_, request)| request.part_no)
            .collect()
    }

    /// Number of records returned by each full page of `table`.
    pub fn page_sizes(&self, table: TableId) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, mode, _)| *called == table && matches!(mode, FetchMode::Full(_)))
            .map(|(_, _, size)| *size)
            .collect()
    }

    pub fn single_calls(&self) -> Vec<(TableId, i64)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(table, mode, _)| match mode {
                FetchMode::Single { id } => Some((*table, *id)),
                FetchMode::Full(_) => None,
            })
            .collect()
    }

    fn respond(&self, table: TableId, mode: &FetchMode) -> Result<Page> {
        let failure = match mode {
            FetchMode::Full(request) => FailPoint::Page(table, request.part_no),
            FetchMode::Single { id } => FailPoint::Single(table, *id),
        };
        if self.failures.lock().unwrap().contains(&failure) {
            return Err(Error::Network(format!("injected failure for {table}")));
        }

        let data = self.data.lock().unwrap();
        let rows = data.get(&table).map(Vec::as_slice).unwrap_or_default();
        let records = match mode {
            FetchMode::Full(request) => {
                let limit = request.limit as usize;
                let start = request.part_no as usize * limit;
                rows.iter().skip(start).take(limit).cloned().collect()
            }
            FetchMode::Single { id } => rows
                .iter()
                .filter(|row| row.server_id().ok() == Some(*id))
                .cloned()
                .collect(),
        };

        Ok(Page {
            records,
            server_update_date: self.update_dates.lock().unwrap().get(&table).cloned(),
        })
    }
}

#[async_trait]
impl BatchFetcher for ScriptedFetcher {
    async fn fetch(&self, table: &TableDescriptor, mode: &FetchMode) -> Result<Page> {
        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open).await.unwrap();

        let result = self.respond(table.table_id, mode);
        let size = result.as_ref().map_or(0, |page| page.records.len());
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((table.table_id, mode.clone(), size));
            calls.len()
        };

        let mut stop_after = self.stop_after.lock().unwrap();
        if stop_after.as_ref().is_some_and(|(limit, _)| count >= *limit) {
            if let Some((_, handle)) = stop_after.take() {
                handle.request_stop();
            }
        }
        drop(stop_after);

        result
    }
}

/// Local store that can be told to fail writes for one table.
pub struct FlakyStore {
    inner: DatabaseService,
    failing: Mutex<Option<TableId>>,
}

impl FlakyStore {
    pub fn new(inner: DatabaseService) -> Self {
        Self {
            inner,
            failing: Mutex::new(None),
        }
    }

    pub fn fail_table(&self, table: TableId) {
        *self.failing.lock().unwrap() = Some(table);
    }
}

#[async_trait]
impl LocalStore for FlakyStore {
    async fn upsert_many(&self, table: &TableDescriptor, records: &[Record]) -> Result<usize> {
        let failing = *self.failing.lock().unwrap();
        if failing == Some(table.table_id) {
            return Err(Error::Database(format!("disk full writing {}", table.name())));
        }
        self.inner.upsert_many(table, records).await
    }
}
