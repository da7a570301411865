//! Per-run cursor and completion bookkeeping.

use std::collections::BTreeMap;

use crate::models::TableId;

/// Cursor and completion flag of one table in the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCursor {
    /// Zero-based page index of the next request
    pub part_no: u32,
    pub done: bool,
}

/// State owned by exactly one orchestrator run.
///
/// Only tables taking part in the run are tracked. `done` can only be set by
/// [`SyncState::observe_empty_page`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncState {
    tables: BTreeMap<TableId, TableCursor>,
}

impl SyncState {
    /// Fresh state: every listed table at part 0 and not done.
    pub fn new(tables: impl IntoIterator<Item = TableId>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|table| (table, TableCursor::default()))
                .collect(),
        }
    }

    pub fn cursor(&self, table: TableId) -> Option<TableCursor> {
        self.tables.get(&table).copied()
    }

    /// Page index to request next for `table`.
    pub fn part_no(&self, table: TableId) -> u32 {
        self.tables.get(&table).map_or(0, |cursor| cursor.part_no)
    }

    /// Record a non-empty page; returns the new cursor.
    pub fn advance(&mut self, table: TableId) -> u32 {
        let cursor = self.tables.entry(table).or_default();
        cursor.part_no += 1;
        cursor.part_no
    }

    /// Record the empty page that exhausts `table`: done, cursor back to 0.
    pub fn observe_empty_page(&mut self, table: TableId) {
        let cursor = self.tables.entry(table).or_default();
        cursor.done = true;
        cursor.part_no = 0;
    }

    /// Untracked tables do not take part in the run and count as done.
    pub fn is_done(&self, table: TableId) -> bool {
        self.tables.get(&table).map_or(true, |cursor| cursor.done)
    }

    pub fn completed(&self) -> usize {
        self.tables.values().filter(|cursor| cursor.done).count()
    }

    pub fn total(&self) -> usize {
        self.tables.len()
    }

    /// Share of tracked tables that are done; `1.0` when nothing is tracked.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.tables.is_empty() {
            return 1.0;
        }
        self.completed() as f64 / self.total() as f64
    }
}
